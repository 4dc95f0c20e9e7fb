use clap::Parser;
use color_eyre::eyre::Result;
use ethers::types::U256;
use lottery_client::{
    AppConfig,
    ConfigOverrides,
    LotteryApp,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Lottery dapp connectivity client")]
struct Cli {
    /// Deployed lottery contract address (falls back to LOTTERY_ADDRESS)
    #[arg(long)]
    contract: Option<String>,

    /// JSON-RPC endpoint of the local node (falls back to LOTTERY_RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Wallet-bridge endpoint tried before the local node
    #[arg(long)]
    wallet_url: Option<String>,

    /// Expected network id; a mismatch is reported but not fatal
    #[arg(long)]
    network_id: Option<u64>,

    #[arg(long)]
    debug: bool,

    /// Submit an entry under this participant name after loading
    #[arg(long)]
    enroll: Option<String>,

    /// Account index to stake from
    #[arg(long, default_value_t = 0)]
    account: usize,

    /// Stake in ether (1 to 1000)
    #[arg(long, default_value = "1")]
    stake: String,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "lottery_client=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = AppConfig::load(ConfigOverrides {
        contract_address: cli.contract,
        rpc_url: cli.rpc_url,
        wallet_url: cli.wallet_url,
        network_id: cli.network_id,
        debug: cli.debug,
    })?;
    init_tracing(config.debug);

    let mut app = LotteryApp::new(config.provider_sources()?, config.contract_address);
    let view = app.initialize_application().await;
    println!("{}", serde_json::to_string_pretty(&view)?);

    if let Some(expected) = config.network_id {
        match app.connector().network_info().await {
            Ok(info) if info.network_id != U256::from(expected) => {
                warn!(
                    expected,
                    actual = %info.network_id,
                    "connected to an unexpected network"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "network id check skipped"),
        }
    }

    if let Some(name) = cli.enroll {
        let updated = app.submit_entry(&name, cli.account, &cli.stake).await?;
        println!("{}", serde_json::to_string_pretty(&updated)?);
    }
    Ok(())
}
