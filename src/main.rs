use argh::FromArgs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tuxbot::commands::{Deps, add_commands};
use tuxbot::console::{self, ConsoleMessenger};
use tuxbot::env::Environment;
use tuxbot::exec::SystemRunner;
use tuxbot::settings::Settings;
use tuxbot::slack::{SlackClient, SlackListener};
use tuxbot::{Bot, Flags, Registry};

#[derive(FromArgs)]
/// Chat-operated build bot.
struct Args {
    #[argh(switch)]
    /// read commands from the terminal instead of Slack.
    console: bool,

    #[argh(option)]
    /// slack channel id to listen on (defaults to $TUXBOT_CHANNEL).
    channel: Option<String>,

    #[argh(switch)]
    /// start in dry-run mode.
    dry_run: bool,

    #[argh(switch)]
    /// start paused.
    paused: bool,

    #[argh(option)]
    /// seconds between two polls of the channel.
    poll_interval: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Args = argh::from_env();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "tuxbot stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let env = Environment::new();
    let mut settings = Settings::from_env(&env)?;
    if args.channel.is_some() {
        settings.channel = args.channel;
    }
    settings.dry_run |= args.dry_run;
    settings.paused |= args.paused;
    if let Some(secs) = args.poll_interval {
        settings.poll_interval = Duration::from_secs(secs.max(1));
    }

    let flags = Flags::shared(settings.paused, settings.dry_run);
    let runner = Arc::new(SystemRunner::new(env.clone()));

    if args.console {
        let messenger = Arc::new(ConsoleMessenger::stdout());
        let bot = Bot::new(registry(&env, &settings, flags, runner, messenger.clone()));
        info!("Started tuxbot console");
        return console::repl(&bot, messenger.as_ref());
    }

    let client = Arc::new(SlackClient::new(settings.require_token()?));
    let channel = settings.require_channel()?.to_string();
    let bot_user_id = client.auth_test()?;
    let bot = Bot::new(registry(&env, &settings, flags, runner, client.clone()))
        .with_trigger(Bot::default_trigger(Some(&bot_user_id))?);

    info!(user = %bot_user_id, %channel, "Started tuxbot");
    SlackListener::new(client, channel, settings.poll_interval).listen(&bot)
}

fn registry(
    env: &Environment,
    settings: &Settings,
    flags: tuxbot::SharedFlags,
    runner: Arc<SystemRunner>,
    messenger: Arc<dyn tuxbot::Messenger>,
) -> Registry {
    let deps = Deps {
        env: env.clone(),
        flags,
        runner,
        messenger,
        build: settings.build.clone(),
    };
    let mut registry = Registry::new();
    add_commands(&mut registry, &deps);
    registry
}
