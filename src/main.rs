use std::io;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use sockprobe::config::{Settings, load_config};
use sockprobe::console::{Command, Console, Flow};
use sockprobe::event_log::EventLog;
use sockprobe::session::Session;
use sockprobe::transport::TransportMode;
use sockprobe::utils::logging;

/// Interactive WebSocket / SockJS / STOMP probe.
///
/// Values given here override `config/default.*` and `SOCKPROBE_*`
/// environment variables. Type `help` at the prompt for commands.
#[derive(Debug, Parser)]
#[command(name = "sockprobe", version, about)]
struct Cli {
    /// Endpoint to connect to
    #[arg(long)]
    url: Option<String>,

    /// Transport to use: raw or sockjs
    #[arg(long)]
    transport: Option<TransportMode>,

    /// Speak STOMP over the transport
    #[arg(long)]
    stomp: bool,

    /// CONNECT header document, e.g. '{"login":"guest"}'
    #[arg(long)]
    connect_headers: Option<String>,

    /// Tracing level written to stderr
    #[arg(long)]
    log_level: Option<String>,

    /// Connect right after start-up
    #[arg(long)]
    connect: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.url {
            settings.connection.url = url.clone();
        }
        if let Some(transport) = self.transport {
            settings.connection.transport = transport;
        }
        if self.stomp {
            settings.connection.stomp = true;
        }
        if let Some(document) = &self.connect_headers {
            settings.connection.connect_headers = document.clone();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let (mut settings, load_error) = match load_config() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    cli.apply(&mut settings);
    logging::init(&settings.logging.level);
    if let Some(e) = load_error {
        error!("Failed to load configuration, using defaults: {e}");
    }

    let log = EventLog::new();
    let session = Session::with_default_transports(log.clone());
    info!(session = %session.id(), url = %settings.connection.url, "sockprobe ready");

    let mut console = Console::new(session, log, settings.connect_config());
    let mut stdout = io::stdout();

    if cli.connect {
        console.execute(Command::Connect, &mut stdout)?;
    }

    let mut input = spawn_input_reader();
    loop {
        let has_transport = console.session().has_transport();
        tokio::select! {
            line = input.recv() => match line {
                Some(Ok(line)) => {
                    if console.handle_line(&line, &mut stdout)? == Flow::Quit {
                        return Ok(());
                    }
                }
                None => break,
                Some(Err(e)) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            },
            _ = console.session_mut().process_next(), if has_transport => {
                console.flush(&mut stdout)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    console.shutdown(&mut stdout)
}

/// Read stdin lines on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
