//! VNDT Protocol CLI
//!
//! Command-line interface over a locally persisted VNDT protocol.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use vndt::cli::{
    format_amount, format_rate, format_ratio, parse_account, parse_amount, CliConfig, OutputFormat,
    OutputFormatter, Workspace,
};
use vndt::core::config::ProtocolParams;
use vndt::protocol::{Operation, OperationResult, Protocol};
use vndt::utils::address::Address;
use vndt::utils::constants::SECONDS_PER_YEAR;

/// VNDT Protocol CLI - collateral-backed stable-value ledger
#[derive(Parser)]
#[command(name = "vndt")]
#[command(version = vndt::VERSION)]
#[command(about = "Command-line interface for the VNDT protocol", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, env = "VNDT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Acting account (label or 0x address); defaults to the configured account
    #[arg(short, long)]
    account: Option<String>,

    /// Output format (text, json, json-pretty)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new protocol in the data directory
    Init(InitArgs),

    /// Protocol status and the acting account's position
    Status,

    /// Account utilities
    #[command(subcommand)]
    Account(AccountCommands),

    /// Credit reserve asset to an account (development only)
    Faucet {
        /// Amount of reserve asset
        amount: String,
        /// Recipient (defaults to the acting account)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show or set the oracle price
    Price {
        /// New price in VNDT per reserve unit (admin only)
        #[arg(long)]
        set: Option<String>,
    },

    /// Collateral operations
    #[command(subcommand)]
    Collateral(CollateralCommands),

    /// Debt operations
    #[command(subcommand)]
    Debt(DebtCommands),

    /// Ledger operations
    #[command(subcommand)]
    Token(TokenCommands),

    /// Staking vault operations
    #[command(subcommand)]
    Vault(VaultCommands),

    /// Liquidate an unsafe position, paying its debt
    Liquidate {
        /// Position owner
        user: String,
    },

    /// Rate controller operations (admin only)
    #[command(subcommand)]
    Rates(RateCommands),

    /// Swap pool operations
    #[command(subcommand)]
    Swap(SwapCommands),

    /// Logical clock
    #[command(subcommand)]
    Time(TimeCommands),

    /// Recent protocol events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Generate a fresh random address
    New,
}

#[derive(Args)]
struct InitArgs {
    /// Replace an existing protocol
    #[arg(long)]
    force: bool,
    /// Initial oracle price
    #[arg(long)]
    price: Option<String>,
    /// Initial borrow rate (basis points)
    #[arg(long)]
    borrow_rate: Option<u128>,
    /// Initial staking rate (basis points)
    #[arg(long)]
    staking_rate: Option<u128>,
}

#[derive(Subcommand)]
enum CollateralCommands {
    /// Lock reserve asset
    Add { amount: String },
    /// Release reserve asset
    Withdraw { amount: String },
}

#[derive(Subcommand)]
enum DebtCommands {
    /// Borrow VNDT
    Mint { amount: String },
    /// Repay VNDT ("max" repays everything owed)
    Repay { amount: String },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Transfer VNDT
    Transfer { to: String, amount: String },
    /// Approve a spender
    Approve { spender: String, amount: String },
    /// Show a balance (defaults to the acting account)
    Balance { account: Option<String> },
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Deposit VNDT
    Stake { amount: String },
    /// Redeem shares ("max" redeems all)
    Unstake { shares: String },
    /// Vault totals and the acting account's shares
    Info,
}

#[derive(Subcommand)]
enum RateCommands {
    /// Set the borrow rate (basis points)
    Borrow { rate_bps: u128 },
    /// Set the staking rate (basis points)
    Staking { rate_bps: u128 },
}

#[derive(Subcommand)]
enum SwapCommands {
    /// Deposit both assets
    AddLiquidity { eth: String, vndt: String },
    /// Buy VNDT with reserve asset
    Buy {
        eth_in: String,
        #[arg(long, default_value = "0")]
        min_out: String,
    },
    /// Sell VNDT for reserve asset
    Sell {
        vndt_in: String,
        #[arg(long, default_value = "0")]
        min_out: String,
    },
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Move the clock forward and accrue both pools
    Advance {
        /// Seconds to advance
        #[arg(long, default_value = "0")]
        seconds: u64,
        /// Days to advance
        #[arg(long, default_value = "0")]
        days: u64,
    },
    /// Show the logical clock
    Show,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::resolve(cli.data_dir.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let out = OutputFormatter::new(cli.format.unwrap_or(config.output));
    if let Err(e) = run_command(&cli, &config, &out) {
        out.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, config: &CliConfig, out: &OutputFormatter) -> anyhow::Result<()> {
    let account = parse_account(cli.account.as_deref().unwrap_or(&config.account))
        .context("invalid acting account")?;

    let mut ws = match &cli.command {
        Commands::Init(args) => return cmd_init(config, args, out),
        Commands::Account(AccountCommands::New) => {
            let address = Address::random();
            out.section("Account", &[("address", address.to_hex())]);
            return Ok(());
        }
        _ => Workspace::open(&config.data_dir)?,
    };

    match &cli.command {
        Commands::Init(_) | Commands::Account(_) => Ok(()),
        Commands::Status => cmd_status(ws.protocol(), &account, out),
        Commands::Faucet { amount, to } => {
            let to = match to {
                Some(to) => parse_account(to)?,
                None => account,
            };
            let amount = parse_amount(amount)?;
            ws.faucet(&to, amount)?;
            out.success(&format!("Credited {} to {}", format_amount(amount, "ETH"), to.short()));
            Ok(())
        }
        Commands::Price { set } => cmd_price(&mut ws, &account, set.as_deref(), out),
        Commands::Collateral(cmd) => cmd_collateral(&mut ws, &account, cmd, out),
        Commands::Debt(cmd) => cmd_debt(&mut ws, &account, cmd, out),
        Commands::Token(cmd) => cmd_token(&mut ws, &account, cmd, out),
        Commands::Vault(cmd) => cmd_vault(&mut ws, &account, cmd, out),
        Commands::Liquidate { user } => cmd_liquidate(&mut ws, &account, user, out),
        Commands::Rates(cmd) => cmd_rates(&mut ws, &account, cmd, out),
        Commands::Swap(cmd) => cmd_swap(&mut ws, &account, cmd, out),
        Commands::Time(cmd) => cmd_time(&mut ws, cmd, out),
        Commands::Events { limit } => {
            let records = ws.protocol().events().records();
            let start = records.len().saturating_sub(*limit);
            out.data(&records[start..]);
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(config: &CliConfig, args: &InitArgs, out: &OutputFormatter) -> anyhow::Result<()> {
    let mut params = ProtocolParams::default();
    if let Some(price) = &args.price {
        params.initial_eth_price = parse_amount(price)?;
    }
    if let Some(rate) = args.borrow_rate {
        params.borrow_rate_bps = rate;
    }
    if let Some(rate) = args.staking_rate {
        params.staking_rate_bps = rate;
    }

    let admin = parse_account(&config.admin).context("invalid admin account")?;
    let genesis = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let ws = Workspace::init(&config.data_dir, admin, params, genesis, args.force)?;

    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
    }

    let addresses = ws.protocol().addresses();
    out.success(&format!("Protocol created in {}", config.data_dir.display()));
    out.section(
        "Addresses",
        &[
            ("admin", addresses.admin.to_hex()),
            ("engine", addresses.engine.to_hex()),
            ("vault", addresses.vault.to_hex()),
            ("rate controller", addresses.rate_controller.to_hex()),
            ("treasury", addresses.treasury.to_hex()),
            ("swap pool", addresses.swap_pool.to_hex()),
        ],
    );
    Ok(())
}

fn cmd_status(protocol: &Protocol, account: &Address, out: &OutputFormatter) -> anyhow::Result<()> {
    let stats = protocol.stats()?;
    let clock = chrono::DateTime::from_timestamp(i64::try_from(protocol.clock()).unwrap_or(i64::MAX), 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| protocol.clock().to_string());

    out.section(
        "Protocol",
        &[
            ("clock", clock),
            ("price", format_amount(protocol.price(), "VNDT/ETH")),
            ("total supply", format_amount(stats.total_supply, "VNDT")),
            ("total collateral", format_amount(stats.total_collateral, "ETH")),
            ("total debt", format_amount(stats.total_debt_value, "VNDT")),
            ("system ratio", format_ratio(stats.system_ratio)),
            ("borrow rate", format_rate(stats.borrow_rate_bps)),
            ("staking rate", format_rate(protocol.vault().staking_rate())),
            ("vault value", format_amount(protocol.vault_balance(), "VNDT")),
            ("open positions", stats.open_positions.to_string()),
            ("liquidatable", stats.liquidatable_positions.to_string()),
        ],
    );

    let position = protocol.position(account);
    let engine = protocol.engine();
    out.section(
        &format!("Account {}", account.short()),
        &[
            ("ETH", format_amount(protocol.reserve_balance_of(account), "ETH")),
            ("VNDT", format_amount(protocol.balance_of(account), "VNDT")),
            ("collateral", format_amount(position.collateral, "ETH")),
            ("debt", format_amount(engine.current_debt_value(account)?, "VNDT")),
            ("ratio", format_ratio(protocol.position_ratio(account)?)),
            ("status", format!("{:?}", position.status())),
            (
                "mintable",
                format_amount(engine.available_to_mint(account, protocol.price())?, "VNDT"),
            ),
            ("vault shares", format_amount(protocol.vault().shares_of(account), "shares")),
        ],
    );

    if protocol.is_liquidatable(account) {
        out.warning("Position is below the minimum collateralization ratio");
    }
    Ok(())
}

fn cmd_price(
    ws: &mut Workspace,
    account: &Address,
    set: Option<&str>,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    if let Some(price) = set {
        let price = parse_amount(price)?;
        ws.execute(account, Operation::SetEthPrice { price })?;
        out.success(&format!("Price set to {}", format_amount(price, "VNDT/ETH")));
    } else {
        out.section(
            "Oracle",
            &[("price", format_amount(ws.protocol().price(), "VNDT/ETH"))],
        );
    }
    Ok(())
}

fn cmd_collateral(
    ws: &mut Workspace,
    account: &Address,
    cmd: &CollateralCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        CollateralCommands::Add { amount } => {
            let amount = parse_amount(amount)?;
            ws.execute(account, Operation::AddCollateral { amount })?;
            out.success(&format!("Added {} collateral", format_amount(amount, "ETH")));
        }
        CollateralCommands::Withdraw { amount } => {
            let amount = parse_amount(amount)?;
            ws.execute(account, Operation::WithdrawCollateral { amount })?;
            out.success(&format!("Withdrew {} collateral", format_amount(amount, "ETH")));
        }
    }
    Ok(())
}

fn cmd_debt(
    ws: &mut Workspace,
    account: &Address,
    cmd: &DebtCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        DebtCommands::Mint { amount } => {
            let amount = parse_amount(amount)?;
            let result = ws.execute(account, Operation::MintVndt { amount })?;
            if let OperationResult::Shares(shares) = result {
                out.success(&format!(
                    "Minted {} ({} debt shares)",
                    format_amount(amount, "VNDT"),
                    format_amount(shares, "")
                ));
            }
        }
        DebtCommands::Repay { amount } => {
            let amount = parse_amount(amount)?;
            let owed = ws.protocol().engine().current_debt_value(account)?;
            let engine = ws.protocol().addresses().engine;
            ensure_allowance(ws, account, engine, amount.min(owed))?;
            let result = ws.execute(account, Operation::RepayUpTo { amount })?;
            if let OperationResult::Amount(repaid) = result {
                out.success(&format!("Repaid {}", format_amount(repaid, "VNDT")));
            }
        }
    }
    Ok(())
}

fn cmd_token(
    ws: &mut Workspace,
    account: &Address,
    cmd: &TokenCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Transfer { to, amount } => {
            let to = parse_account(to)?;
            let amount = parse_amount(amount)?;
            ws.execute(account, Operation::Transfer { to, amount })?;
            out.success(&format!("Sent {} to {}", format_amount(amount, "VNDT"), to.short()));
        }
        TokenCommands::Approve { spender, amount } => {
            let spender = parse_account(spender)?;
            let amount = parse_amount(amount)?;
            ws.execute(account, Operation::Approve { spender, amount })?;
            out.success(&format!("Approved {} for {}", spender.short(), format_amount(amount, "VNDT")));
        }
        TokenCommands::Balance { account: target } => {
            let target = match target {
                Some(t) => parse_account(t)?,
                None => *account,
            };
            let protocol = ws.protocol();
            out.section(
                &format!("Balance {}", target.short()),
                &[
                    ("VNDT", format_amount(protocol.balance_of(&target), "VNDT")),
                    ("ETH", format_amount(protocol.reserve_balance_of(&target), "ETH")),
                    ("source", format!("{:?}", protocol.ledger().resolve(&target))),
                ],
            );
        }
    }
    Ok(())
}

fn cmd_vault(
    ws: &mut Workspace,
    account: &Address,
    cmd: &VaultCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        VaultCommands::Stake { amount } => {
            let amount = parse_amount(amount)?;
            let vault = ws.protocol().addresses().vault;
            ensure_allowance(ws, account, vault, amount)?;
            let result = ws.execute(account, Operation::Stake { amount })?;
            if let OperationResult::Shares(shares) = result {
                out.success(&format!(
                    "Staked {} for {}",
                    format_amount(amount, "VNDT"),
                    format_amount(shares, "shares")
                ));
            }
        }
        VaultCommands::Unstake { shares } => {
            let shares = match parse_amount(shares)? {
                u128::MAX => ws.protocol().vault().shares_of(account),
                n => n,
            };
            let result = ws.execute(account, Operation::Unstake { shares })?;
            if let OperationResult::Amount(value) = result {
                out.success(&format!("Unstaked for {}", format_amount(value, "VNDT")));
            }
        }
        VaultCommands::Info => {
            let vault = ws.protocol().vault();
            let shares = vault.shares_of(account);
            out.section(
                "Vault",
                &[
                    ("total value", format_amount(vault.total_value(), "VNDT")),
                    ("total shares", format_amount(vault.total_shares(), "shares")),
                    ("staking rate", format_rate(vault.staking_rate())),
                    ("stakers", vault.staker_count().to_string()),
                    ("your shares", format_amount(shares, "shares")),
                    ("your value", format_amount(vault.get_shares_value(shares)?, "VNDT")),
                ],
            );
        }
    }
    Ok(())
}

fn cmd_liquidate(
    ws: &mut Workspace,
    account: &Address,
    user: &str,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    let user = parse_account(user)?;
    if !ws.protocol().is_liquidatable(&user) {
        bail!("position {} is not liquidatable", user.short());
    }

    let debt = ws.protocol().engine().current_debt_value(&user)?;
    let engine = ws.protocol().addresses().engine;
    ensure_allowance(ws, account, engine, debt)?;
    if let OperationResult::Liquidation(result) = ws.execute(account, Operation::Liquidate { user })? {
        out.success(&format!("Liquidated {}", user.short()));
        out.data(&result);
    }
    Ok(())
}

fn cmd_rates(
    ws: &mut Workspace,
    account: &Address,
    cmd: &RateCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        RateCommands::Borrow { rate_bps } => {
            ws.execute(account, Operation::UpdateBorrowRate { rate_bps: *rate_bps })?;
            out.success(&format!("Borrow rate set to {}", format_rate(*rate_bps)));
        }
        RateCommands::Staking { rate_bps } => {
            ws.execute(account, Operation::UpdateStakingRate { rate_bps: *rate_bps })?;
            out.success(&format!("Staking rate set to {}", format_rate(*rate_bps)));
        }
    }
    Ok(())
}

fn cmd_swap(
    ws: &mut Workspace,
    account: &Address,
    cmd: &SwapCommands,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    match cmd {
        SwapCommands::AddLiquidity { eth, vndt } => {
            let eth_amount = parse_amount(eth)?;
            let vndt_amount = parse_amount(vndt)?;
            ws.execute(account, Operation::AddLiquidity { eth_amount, vndt_amount })?;
            out.success(&format!(
                "Added {} and {} to the pool",
                format_amount(eth_amount, "ETH"),
                format_amount(vndt_amount, "VNDT")
            ));
        }
        SwapCommands::Buy { eth_in, min_out } => {
            let eth_in = parse_amount(eth_in)?;
            let min_out = parse_amount(min_out)?;
            if let OperationResult::Amount(out_amount) =
                ws.execute(account, Operation::SwapEthForVndt { eth_in, min_out })?
            {
                out.success(&format!(
                    "Swapped {} for {}",
                    format_amount(eth_in, "ETH"),
                    format_amount(out_amount, "VNDT")
                ));
            }
        }
        SwapCommands::Sell { vndt_in, min_out } => {
            let vndt_in = parse_amount(vndt_in)?;
            let min_out = parse_amount(min_out)?;
            if let OperationResult::Amount(out_amount) =
                ws.execute(account, Operation::SwapVndtForEth { vndt_in, min_out })?
            {
                out.success(&format!(
                    "Swapped {} for {}",
                    format_amount(vndt_in, "VNDT"),
                    format_amount(out_amount, "ETH")
                ));
            }
        }
    }
    Ok(())
}

fn cmd_time(ws: &mut Workspace, cmd: &TimeCommands, out: &OutputFormatter) -> anyhow::Result<()> {
    match cmd {
        TimeCommands::Advance { seconds, days } => {
            let total = days
                .checked_mul(86_400)
                .and_then(|d| d.checked_add(*seconds))
                .context("time advance overflows")?;
            if total == 0 {
                bail!("nothing to advance; pass --seconds or --days");
            }
            let now = ws.advance_time(total)?;
            out.success(&format!(
                "Clock advanced by {}s ({:.4} years) to {}",
                total,
                total as f64 / SECONDS_PER_YEAR as f64,
                now
            ));
        }
        TimeCommands::Show => {
            out.section("Clock", &[("now", ws.protocol().clock().to_string())]);
        }
    }
    Ok(())
}

/// Raise `spender`'s allowance over `owner` to at least `amount`
fn ensure_allowance(
    ws: &mut Workspace,
    owner: &Address,
    spender: Address,
    amount: u128,
) -> anyhow::Result<()> {
    if ws.protocol().ledger().allowance(owner, &spender) >= amount {
        return Ok(());
    }
    ws.execute(owner, Operation::Approve { spender, amount })
        .context("approving the protocol to pull VNDT")?;
    Ok(())
}
