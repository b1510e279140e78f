use structopt::StructOpt;

/// Serves the latest search result for every connected search box.
#[derive(StructOpt)]
pub struct Options {
    /// Path of the config file
    #[structopt(default_value = "config.toml")]
    pub config: String,

    /// Listen address, overrides `bind` from the config file
    #[structopt(long)]
    pub bind: Option<String>,
}
