mod api;
mod gateway;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use slipbot_channels::TwilioChannel;
use slipbot_core::{
    config::{self, shellexpand, Config, MpesaConfig},
    entitlement::{PaidTier, PaymentEvent},
    identity::SubscriberId,
    traits::{AnswerProvider, PaymentGateway},
};
use slipbot_memory::{open_store, EntitlementMachine};
use slipbot_payments::DarajaGateway;
use slipbot_providers::{FallbackChain, OpenAiCompatProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "slipbot",
    version,
    about = "Slipbot: WhatsApp tips subscriptions with M-Pesa billing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server.
    Start,
    /// Show configuration and collaborator readiness.
    Status,
    /// Print a subscriber's record and current tier.
    Inspect {
        /// Phone number, bare or `whatsapp:+` form.
        phone: String,
    },
    /// Record a payment by hand, dated today.
    Grant {
        phone: String,
        #[arg(value_enum)]
        tier: TierArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Normal,
    Premium,
}

impl From<TierArg> for PaidTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Normal => PaidTier::Normal,
            TierArg::Premium => PaidTier::Premium,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env is optional.
    dotenvy::dotenv().ok();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env_overrides();
    cfg.validate()?;

    let _log_guard = init_tracing(&cfg)?;

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await,
        Commands::Inspect { phone } => {
            let machine = build_machine(&cfg).await?;
            let id = SubscriberId::parse(&phone)?;
            let snapshot = machine.snapshot(&id, Utc::now()).await?;
            println!("{id}");
            println!("  tier:           {}", snapshot.tier);
            println!("  rules accepted: {}", snapshot.record.rules_accepted);
            println!(
                "  normal grant:   {}",
                snapshot
                    .record
                    .normal_grant
                    .map(|g| g.granted_on.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            println!(
                "  premium grant:  {}",
                snapshot
                    .record
                    .premium_grant
                    .map(|g| g.granted_on.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            machine.store().close().await?;
        }
        Commands::Grant { phone, tier } => {
            let machine = build_machine(&cfg).await?;
            let tier = PaidTier::from(tier);
            let prices = prices(&cfg);
            let event = PaymentEvent {
                subscriber: SubscriberId::parse(&phone)?,
                tier,
                amount: prices.of(tier),
                confirmed_on: Utc::now().date_naive(),
                receipt: None,
            };
            let confirmed = machine.on_payment_confirmed(&event).await?;
            let now_tier = machine.derive_effective_tier(&confirmed.record, Utc::now());
            if confirmed.changed {
                info!("manual grant: {} {tier}", event.subscriber);
                println!("{}: {tier} granted, now {now_tier}", event.subscriber);
            } else {
                println!("{}: already holds {tier} from today, now {now_tier}", event.subscriber);
            }
            machine.store().close().await?;
        }
    }

    Ok(())
}

/// Console logging plus a daily-rolling file under `{data_dir}/logs`.
///
/// The returned guard flushes the file writer on drop; hold it for the life
/// of the process.
fn init_tracing(cfg: &Config) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = format!("{}/logs", shellexpand(&cfg.bot.data_dir));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "slipbot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.bot.log_level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    let twilio = cfg
        .channel
        .twilio
        .clone()
        .filter(|tw| tw.enabled)
        .ok_or_else(|| anyhow::anyhow!("[channel.twilio] must be configured and enabled"))?;
    if twilio.account_sid.is_empty() || twilio.auth_token.is_empty() {
        anyhow::bail!(
            "Twilio is enabled but credentials are empty. \
             Set them in config.toml or TWILIO_SID / TWILIO_AUTH env vars."
        );
    }
    let channel = TwilioChannel::new(twilio);
    let admin_target = channel.admin_address();

    let answers = build_answers(&cfg);
    if answers.is_empty() {
        warn!("no answer providers enabled; free-text questions will get an apology");
    }
    let answer_timeout = answer_timeout(&cfg, answers.names().len());

    let payments = build_payments(&cfg);
    if payments.is_none() {
        warn!("M-Pesa disabled; subscribe requests will fail");
    }

    let machine = build_machine(&cfg).await?;
    let store = machine.store().clone();

    let gw = Arc::new(gateway::Gateway::new(
        machine,
        Arc::new(answers),
        payments,
        Arc::new(channel),
        Arc::new(gateway::StaticSlips::new(cfg.slips.clone())),
        admin_target,
        cfg.bot.name.clone(),
        prices(&cfg),
        gateway::Timeouts {
            answer: answer_timeout,
            payment: Duration::from_secs(cfg.payments.timeout_secs),
        },
    ));

    let callback_token = cfg
        .payments
        .mpesa
        .as_ref()
        .map(|m| m.callback_token.as_str())
        .unwrap_or_default();
    let state = api::ApiState::new(gw, callback_token);

    info!("{} starting", cfg.bot.name);
    let served = api::serve(&cfg.api, state).await;

    if let Err(e) = store.close().await {
        warn!("store close failed: {e}");
    }
    served
}

async fn status(config_path: &str, cfg: &Config) {
    println!("{} status\n", cfg.bot.name);
    println!("Config: {config_path}");
    println!(
        "Store:  {} ({})",
        cfg.store.backend,
        match cfg.store.backend.as_str() {
            "sqlite" => shellexpand(&cfg.store.db_path),
            _ => shellexpand(&cfg.store.path),
        }
    );
    println!("API:    {}:{}", cfg.api.host, cfg.api.port);
    println!();

    let answers = build_answers(cfg);
    println!(
        "  answers: {}",
        if answers.is_empty() {
            "none enabled".to_string()
        } else {
            answers.names().join(" -> ")
        }
    );

    match &cfg.channel.twilio {
        Some(tw) if tw.enabled && !tw.account_sid.is_empty() && !tw.auth_token.is_empty() => {
            println!("  twilio:  configured ({})", tw.whatsapp_number)
        }
        Some(tw) if tw.enabled => println!("  twilio:  enabled but missing credentials"),
        Some(_) => println!("  twilio:  disabled"),
        None => println!("  twilio:  not configured"),
    }

    match &cfg.payments.mpesa {
        Some(mp) if mp.enabled && mpesa_ready(mp) => {
            println!("  mpesa:   configured (shortcode {})", mp.shortcode)
        }
        Some(mp) if mp.enabled => println!("  mpesa:   enabled but missing credentials"),
        Some(_) => println!("  mpesa:   disabled"),
        None => println!("  mpesa:   not configured"),
    }

    match open_store(&cfg.store).await {
        Ok(store) => {
            match store.count().await {
                Ok(n) => println!("  store:   {n} subscribers"),
                Err(e) => println!("  store:   unreadable ({e})"),
            }
            if let Err(e) = store.close().await {
                warn!("store close failed: {e}");
            }
        }
        Err(e) => println!("  store:   unavailable ({e})"),
    }
}

async fn build_machine(cfg: &Config) -> anyhow::Result<EntitlementMachine> {
    let store = open_store(&cfg.store).await?;
    Ok(EntitlementMachine::new(store, cfg.entitlements.window_days))
}

/// Providers in `provider.chain` order. Unknown and disabled names are skipped.
fn build_answers(cfg: &Config) -> FallbackChain {
    let p = &cfg.provider;
    let mut providers: Vec<Arc<dyn AnswerProvider>> = Vec::new();

    for name in &p.chain {
        match name.as_str() {
            "openai" => match &p.openai {
                Some(c) if c.enabled => providers.push(Arc::new(OpenAiCompatProvider::openai(
                    c,
                    &p.system_prompt,
                ))),
                _ => {}
            },
            "xai" => match &p.xai {
                Some(c) if c.enabled => {
                    providers.push(Arc::new(OpenAiCompatProvider::xai(c, &p.system_prompt)))
                }
                _ => {}
            },
            other => warn!("unknown answer provider '{other}' in provider.chain, skipping"),
        }
    }

    FallbackChain::new(providers, Duration::from_secs(p.timeout_secs))
}

/// Outer bound for the whole chain: one per-link timeout per provider.
fn answer_timeout(cfg: &Config, links: usize) -> Duration {
    Duration::from_secs(cfg.provider.timeout_secs) * links.max(1) as u32
}

fn mpesa_ready(mp: &MpesaConfig) -> bool {
    !mp.consumer_key.is_empty()
        && !mp.consumer_secret.is_empty()
        && !mp.shortcode.is_empty()
        && !mp.passkey.is_empty()
        && !mp.callback_url.is_empty()
}

fn build_payments(cfg: &Config) -> Option<Arc<dyn PaymentGateway>> {
    let mp = cfg.payments.mpesa.as_ref().filter(|m| m.enabled)?;
    if !mpesa_ready(mp) {
        warn!("M-Pesa is enabled but credentials are incomplete");
    }
    Some(Arc::new(DarajaGateway::new(mp.clone())))
}

fn prices(cfg: &Config) -> gateway::replies::Prices {
    let defaults = MpesaConfig::default();
    let mp = cfg.payments.mpesa.as_ref().unwrap_or(&defaults);
    gateway::replies::Prices {
        normal: mp.normal_amount,
        premium: mp.premium_amount,
    }
}
