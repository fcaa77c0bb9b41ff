use clap::Parser;

/// Command-line overrides. Anything left unset falls back to the environment.
#[derive(Debug, Parser)]
#[command(name = "dashboard", version, about = "DeFi dashboard data coordinator")]
pub struct Cli {
    /// Watch-list, comma separated (e.g. `btc,eth,sol`)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,

    /// Holdings as `SYMBOL:AMOUNT`, comma separated
    #[arg(long)]
    pub holdings: Option<String>,

    #[arg(long)]
    pub market_interval_secs: Option<u64>,

    #[arg(long)]
    pub portfolio_interval_secs: Option<u64>,

    #[arg(long)]
    pub ai_interval_secs: Option<u64>,

    /// Maximum simultaneous upstream requests
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Seconds between status reports
    #[arg(long, default_value_t = 30)]
    pub report_every_secs: u64,

    /// Emit JSON logs
    #[arg(long)]
    pub json: bool,

    /// Refresh every category once, print the results and exit
    #[arg(long)]
    pub once: bool,
}
