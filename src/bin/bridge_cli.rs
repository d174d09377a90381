//! Bridge CLI
//!
//! Invokes bridges through the proxy contract from the command line.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin bridge_cli -- --config config/bridge_client.toml convert \
//!     --bridge 0x... --input-a erc20:0x6b175474e89094c44da98b954eedeac495271d0f:1 \
//!     --output-a erc20:0x1494ca1f11d487c2bbe4543e90080aeba4ba3c2b:2 \
//!     --total-input-value 1000000000000000000000
//! ```
//!
//! `--dry-run` prints the calldata instead of sending it, for use with
//! `cast send <proxy> --data ...`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use defi_bridge_client::{
    abi, AssetDescriptor, BridgeCallRequest, BridgeClientConfig, DefiBridgeProxy, SendTxOptions,
};
use ethereum_types::U256;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "bridge_cli",
    author,
    version,
    about = "Invoke DeFi bridges through the convert/finalise proxy contract"
)]
struct Cli {
    /// Path to configuration file (default: BRIDGE_CLIENT_CONFIG_PATH env var or config/bridge_client.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert input assets into output assets through a bridge
    Convert {
        #[command(flatten)]
        call: CallArgs,

        /// Amount of input asset A handed to the bridge (base units, decimal)
        #[arg(long)]
        total_input_value: String,
    },
    /// Finalise an async interaction
    Finalise {
        #[command(flatten)]
        call: CallArgs,
    },
    /// Check whether an async interaction can be finalised (read-only)
    CanFinalise {
        #[arg(long)]
        bridge: String,

        #[arg(long)]
        interaction_nonce: String,
    },
    /// Show a native (or ERC20 with --token) balance
    Balance {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CallArgs {
    /// Bridge contract address
    #[arg(long)]
    bridge: String,

    /// Assets: not-used | eth[:id] | erc20:<address>[:id] | virtual[:id]
    #[arg(long)]
    input_a: AssetDescriptor,

    #[arg(long, default_value = "not-used")]
    input_b: AssetDescriptor,

    #[arg(long)]
    output_a: AssetDescriptor,

    #[arg(long, default_value = "not-used")]
    output_b: AssetDescriptor,

    #[arg(long, default_value = "0")]
    interaction_nonce: String,

    /// Bridge-specific parameter, passed through uninterpreted
    #[arg(long, default_value = "0")]
    aux_data: String,

    #[arg(long)]
    gas_limit: Option<u64>,

    /// Gas price ceiling in wei (decimal)
    #[arg(long)]
    gas_price: Option<String>,

    /// Print calldata and exit without contacting the node
    #[arg(long)]
    dry_run: bool,
}

impl CallArgs {
    fn request(&self, total_input_value: U256) -> Result<BridgeCallRequest> {
        let bridge = abi::parse_address(&self.bridge).context("--bridge")?;
        Ok(BridgeCallRequest::new(bridge)
            .input_a(self.input_a)
            .input_b(self.input_b)
            .output_a(self.output_a)
            .output_b(self.output_b)
            .total_input_value(total_input_value)
            .interaction_nonce(abi::parse_u256(&self.interaction_nonce).context("--interaction-nonce")?)
            .aux_data(abi::parse_u256(&self.aux_data).context("--aux-data")?))
    }

    fn options(&self) -> Result<SendTxOptions> {
        let gas_price = self
            .gas_price
            .as_deref()
            .map(abi::parse_u256)
            .transpose()
            .context("--gas-price")?;
        Ok(SendTxOptions {
            gas_price,
            gas_limit: self.gas_limit,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    let config = BridgeClientConfig::load_from_path(cli.config.as_deref())
        .context("Failed to load configuration")?;
    info!(
        "Using chain {} (chain ID: {}) at {}",
        config.chain.name, config.chain.chain_id, config.chain.rpc_url
    );

    match cli.command {
        Command::Convert {
            call,
            total_input_value,
        } => {
            let total_input_value =
                abi::parse_u256(&total_input_value).context("--total-input-value")?;
            let request = call.request(total_input_value)?;
            if call.dry_run {
                print_calldata(&config, "convert", &request.encode_convert());
                return Ok(());
            }
            let proxy = DefiBridgeProxy::new(&config)?;
            let result = proxy.convert(&request, call.options()?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Finalise { call } => {
            let request = call.request(U256::zero())?;
            if call.dry_run {
                print_calldata(&config, "finalise", &request.encode_finalise());
                return Ok(());
            }
            let proxy = DefiBridgeProxy::new(&config)?;
            let result = proxy.finalise(&request, call.options()?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::CanFinalise {
            bridge,
            interaction_nonce,
        } => {
            let bridge = abi::parse_address(&bridge).context("--bridge")?;
            let nonce = abi::parse_u256(&interaction_nonce).context("--interaction-nonce")?;
            let proxy = DefiBridgeProxy::new(&config)?;
            let ready = proxy.can_finalise(&bridge, nonce).await?;
            println!("{}", ready);
        }
        Command::Balance { owner, token } => {
            let owner = abi::parse_address(&owner).context("--owner")?;
            let proxy = DefiBridgeProxy::new(&config)?;
            let balance = match token {
                Some(token) => {
                    let token = abi::parse_address(&token).context("--token")?;
                    proxy.client().erc20_balance_of(&token, &owner).await?
                }
                None => proxy.client().get_balance(&owner).await?,
            };
            println!("{}", balance);
        }
    }

    Ok(())
}

fn print_calldata(config: &BridgeClientConfig, operation: &str, data: &[u8]) {
    println!("=== {} via proxy {} ===\n", operation, config.proxy.address);
    println!("  cast send {} --data {}", config.proxy.address, abi::to_hex(data));
}
