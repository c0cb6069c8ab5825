mod parse;
mod usage;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossterm::style::Stylize;
use crossterm::{ExecutableCommand, QueueableCommand, cursor, event, terminal};
use libkvbridge::{
    Call, Client, ClientConfig, CommandKind, HostValue, NodeAddress, Reply, ScriptedTransport,
    TcpTransport, Transport, logger,
};
use parse::{Input, parse_line};
use usage::help;

const HISTORY_CAPACITY: usize = 100;
const PROMPT: &str = "kvbridge> ";

#[derive(Debug, Parser)]
#[command(version, about = "Interactive shell for Redis-compatible stores")]
struct Cli {
    #[arg(long = "host", help = "Server host, overrides the config file")]
    host: Option<String>,

    #[arg(short = 'p', long = "port", help = "Server port, overrides the config file")]
    port: Option<u16>,

    #[arg(short = 'c', long = "config", help = "JSON client configuration")]
    config: Option<PathBuf>,

    #[arg(long = "log-level", help = "error, warn, info, debug, trace or off")]
    log_level: Option<String>,

    #[arg(long = "log-file", help = "Append log lines here instead of stderr")]
    log_file: Option<PathBuf>,

    #[arg(long = "dry-run", help = "Print encoded requests without connecting")]
    dry_run: bool,

    #[arg(long = "json", help = "Print replies as JSON")]
    json: bool,

    #[arg(
        trailing_var_arg = true,
        help = "Run a single command and exit, e.g. `GET mykey`"
    )]
    command: Vec<String>,
}

impl Cli {
    /// The config file (or the defaults) with command line overrides applied.
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if self.host.is_some() || self.port.is_some() {
            let first = config.addresses.first().cloned().unwrap_or_default();
            config.addresses = vec![NodeAddress {
                host: self.host.clone().unwrap_or(first.host),
                port: self.port.unwrap_or(first.port),
            }];
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Ring buffer of the last `HISTORY_CAPACITY` lines.
#[derive(Default, Debug)]
struct History {
    commands: Vec<String>,
    /// Position being browsed, 0 is the oldest entry.
    current_index: Option<usize>,
    start: usize,
    len: usize,
}

impl History {
    fn new() -> Self {
        Self {
            commands: vec![String::new(); HISTORY_CAPACITY],
            ..Default::default()
        }
    }

    fn slot(&self, pos: usize) -> usize {
        (self.start + pos) % HISTORY_CAPACITY
    }

    fn push(&mut self, command: String) {
        self.current_index = None;

        if self.len > 0 && self.commands[self.slot(self.len - 1)] == command {
            return;
        }

        if self.len < HISTORY_CAPACITY {
            let index = self.slot(self.len);
            self.commands[index] = command;
            self.len += 1;
        } else {
            self.commands[self.start] = command;
            self.start = (self.start + 1) % HISTORY_CAPACITY;
        }
    }

    fn previous_command(&mut self) -> Option<&String> {
        let pos = match self.current_index {
            _ if self.len == 0 => return None,
            None => self.len - 1,
            Some(pos) if pos > 0 => pos - 1,
            // Already at oldest
            Some(_) => return None,
        };
        self.current_index = Some(pos);
        self.commands.get(self.slot(pos))
    }

    fn next_command(&mut self) -> Option<&String> {
        match self.current_index {
            Some(pos) if pos + 1 < self.len => {
                self.current_index = Some(pos + 1);
                self.commands.get(self.slot(pos + 1))
            }
            _ => {
                self.current_index = None;
                None
            }
        }
    }
}

struct TerminalGuard {}

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self {})
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Redraws the line from `cursor_pos` and puts the cursor back.
fn redraw(stdout: &mut io::Stdout, line: &str, cursor_pos: usize) -> io::Result<()> {
    stdout.queue(cursor::MoveToColumn((PROMPT.len() + cursor_pos) as u16))?;
    stdout.queue(terminal::Clear(terminal::ClearType::UntilNewLine))?;
    print!("{}", &line[cursor_pos..]);
    stdout.queue(cursor::MoveToColumn((PROMPT.len() + cursor_pos) as u16))?;
    stdout.flush()
}

/// Replaces the whole line, e.g. with a history entry.
fn replace_line(stdout: &mut io::Stdout, line: &mut String, with: &str) -> io::Result<usize> {
    *line = with.to_string();
    redraw(stdout, line, 0)?;
    stdout.execute(cursor::MoveToColumn((PROMPT.len() + line.len()) as u16))?;
    Ok(line.len())
}

/// Handle user interaction with the terminal.
/// Returns the line once `Enter` is pressed, `None` on `Esc` or `Ctrl-C`.
fn read_line(history: &mut History) -> io::Result<Option<String>> {
    let mut line = String::new();
    let mut cursor_pos: usize = 0;
    let mut stdout = io::stdout();

    stdout.execute(cursor::MoveToColumn(0))?;
    stdout.queue(terminal::Clear(terminal::ClearType::UntilNewLine))?;
    print!("{PROMPT}");
    stdout.flush()?;

    loop {
        let event::Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != event::KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            event::KeyCode::Char('c')
                if key_event.modifiers.contains(event::KeyModifiers::CONTROL) =>
            {
                print!("\r\n");
                return Ok(None);
            }
            event::KeyCode::Esc => {
                print!("\r\n");
                return Ok(None);
            }
            event::KeyCode::Enter => {
                print!("\r\n");
                stdout.execute(cursor::MoveToColumn(0))?;
                return Ok(Some(line));
            }
            event::KeyCode::Backspace if cursor_pos > 0 => {
                cursor_pos -= 1;
                line.remove(cursor_pos);
                redraw(&mut stdout, &line, cursor_pos)?;
            }
            event::KeyCode::Delete if cursor_pos < line.len() => {
                line.remove(cursor_pos);
                redraw(&mut stdout, &line, cursor_pos)?;
            }
            event::KeyCode::Left if cursor_pos > 0 => {
                cursor_pos -= 1;
                stdout.execute(cursor::MoveLeft(1))?;
            }
            event::KeyCode::Right if cursor_pos < line.len() => {
                cursor_pos += 1;
                stdout.execute(cursor::MoveRight(1))?;
            }
            event::KeyCode::Home => {
                cursor_pos = 0;
                stdout.execute(cursor::MoveToColumn(PROMPT.len() as u16))?;
            }
            event::KeyCode::End => {
                cursor_pos = line.len();
                stdout.execute(cursor::MoveToColumn((PROMPT.len() + cursor_pos) as u16))?;
            }
            event::KeyCode::Up => {
                if let Some(cmd) = history.previous_command() {
                    let cmd = cmd.clone();
                    cursor_pos = replace_line(&mut stdout, &mut line, &cmd)?;
                }
            }
            event::KeyCode::Down => {
                let cmd = history.next_command().cloned().unwrap_or_default();
                cursor_pos = replace_line(&mut stdout, &mut line, &cmd)?;
            }
            event::KeyCode::Char(c) if c.is_ascii() => {
                line.insert(cursor_pos, c);
                redraw(&mut stdout, &line, cursor_pos)?;
                cursor_pos += 1;
                stdout.execute(cursor::MoveToColumn((PROMPT.len() + cursor_pos) as u16))?;
            }
            _ => {}
        }
    }
}

/// Lets the shell show what a transport actually sent.
trait Describe {
    /// Text of the last request, when it should be echoed.
    fn last_request(&self) -> Option<String> {
        None
    }
}

impl Describe for TcpTransport {}

fn request_text(kind: CommandKind, args: &[Vec<u8>]) -> String {
    let mut text = kind.to_string();
    for arg in args {
        text.push_str(&format!(" {:?}", String::from_utf8_lossy(arg)));
    }
    text
}

impl Describe for ScriptedTransport {
    fn last_request(&self) -> Option<String> {
        self.calls().last().map(|call| match call {
            Call::Send { kind, args } => request_text(*kind, args),
            Call::Routed { kind, args, route } => {
                format!("{} @ {route}", request_text(*kind, args))
            }
            Call::Batch {
                commands,
                is_atomic,
            } => {
                let (open, close) = if *is_atomic {
                    ("MULTI", "EXEC")
                } else {
                    ("PIPELINE", "END")
                };
                let mut lines = vec![open.to_string()];
                lines.extend(
                    commands
                        .iter()
                        .map(|(kind, args)| format!("  {}", request_text(*kind, args))),
                );
                lines.push(close.to_string());
                lines.join("\r\n")
            }
        })
    }
}

struct Shell<T> {
    client: Client<T>,
    json: bool,
    /// Set when replies are canned, so only the requests are worth showing.
    dry_run: bool,
}

impl<T: Transport + Describe> Shell<T> {
    fn print_value(&self, value: &HostValue) {
        if self.json {
            match serde_json::to_string(value) {
                Ok(text) => println!("{text}\r"),
                Err(e) => eprintln!("{}\r", format!("ERROR: {e}").red()),
            }
        } else {
            println!("{}\r", value.to_string().green());
        }
    }

    fn echo_request(&self) {
        if let Some(text) = self.client.transport().last_request() {
            println!("{}\r", text.dark_grey());
        }
    }

    /// Runs one line. Returns `Ok(false)` when the session should end.
    fn run_line(&mut self, line: &str) -> Result<bool, String> {
        let input = parse_line(line)?;
        log::debug!("shell input {input:?}");

        match input {
            Input::Help => help(),
            Input::Exit => return Ok(false),
            Input::Multi => {
                self.client.multi().map_err(|e| e.to_string())?;
                println!("{}\r", "OK (transaction)".yellow());
            }
            Input::Pipeline => {
                self.client.pipeline().map_err(|e| e.to_string())?;
                println!("{}\r", "OK (pipeline)".yellow());
            }
            Input::Discard => {
                self.client.discard().map_err(|e| e.to_string())?;
                println!("{}\r", "OK (discarded)".yellow());
            }
            Input::Exec => {
                let queued = self.client.batch().len();
                let result = self.client.exec();
                if queued > 0 {
                    self.echo_request();
                }
                let values = result.map_err(|e| e.to_string())?;
                if !self.dry_run {
                    for (index, value) in values.iter().enumerate() {
                        print!("{}) ", index + 1);
                        self.print_value(value);
                    }
                }
            }
            Input::Run(command) => {
                let result = self.client.execute(&command);
                match &result {
                    Ok(Reply::Value(_)) | Err(_) => self.echo_request(),
                    Ok(Reply::Queued(_)) => {}
                }
                match result.map_err(|e| e.to_string())? {
                    Reply::Value(value) if !self.dry_run => self.print_value(&value),
                    Reply::Value(_) => {}
                    Reply::Queued(handle) => {
                        println!("{}\r", format!("QUEUED #{}", handle.index() + 1).yellow());
                    }
                }
            }
        }

        Ok(true)
    }

    fn repl(&mut self) -> anyhow::Result<()> {
        println!("If stuck try `HELP`");
        println!("To end session `QUIT` or `EXIT`");
        println!("Press `Esc` to quit");
        println!("Use ↑/↓ arrows for command history");

        let _guard = TerminalGuard::new().context("Enable raw terminal mode")?;
        let mut hist = History::new();

        loop {
            let Some(line) = read_line(&mut hist)? else {
                println!("Exiting..\r");
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            hist.push(line.to_string());

            match self.run_line(line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => eprintln!("{}\r", format!("ERROR: {err}").red()),
            }
        }

        if self.client.batch().is_active() {
            log::warn!("session ended with {} queued command(s)", self.client.batch().len());
        }
        Ok(())
    }

    fn run(&mut self, words: &[String]) -> anyhow::Result<()> {
        let line = words
            .iter()
            .map(|w| {
                if w.is_empty() || w.contains(char::is_whitespace) {
                    format!("{w:?}")
                } else {
                    w.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        match self.run_line(&line) {
            Ok(_) => Ok(()),
            Err(err) => anyhow::bail!(err),
        }
    }
}

fn start<T: Transport + Describe>(shell: &mut Shell<T>, command: &[String]) -> anyhow::Result<()> {
    if command.is_empty() {
        shell.repl()
    } else {
        shell.run(command)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = args.client_config()?;
    logger::init(config.level()?, config.log_file.as_deref())?;

    let result = if args.dry_run {
        log::info!("dry run, nothing will be sent");
        let mut shell = Shell {
            client: Client::new(ScriptedTransport::new()),
            json: args.json,
            dry_run: true,
        };
        start(&mut shell, &args.command)
    } else {
        let transport = TcpTransport::connect(&config).with_context(|| {
            format!(
                "Failed to connect to {}! Is it running?",
                config
                    .addresses
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        log::info!(
            "connected to {} speaking RESP{}",
            transport.address(),
            transport.protocol()
        );
        let mut shell = Shell {
            client: Client::new(transport),
            json: args.json,
            dry_run: false,
        };
        start(&mut shell, &args.command)
    };

    logger::flush();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_browse() {
        let mut hist = History::new();
        assert!(hist.previous_command().is_none());

        hist.push("GET a".to_string());
        hist.push("GET b".to_string());
        hist.push("GET b".to_string());
        assert_eq!(hist.len, 2);

        assert_eq!(hist.previous_command().map(String::as_str), Some("GET b"));
        assert_eq!(hist.previous_command().map(String::as_str), Some("GET a"));
        assert!(hist.previous_command().is_none());
        assert_eq!(hist.next_command().map(String::as_str), Some("GET b"));
        assert!(hist.next_command().is_none());
    }

    #[test]
    fn test_history_wraps() {
        let mut hist = History::new();
        for i in 0..HISTORY_CAPACITY + 5 {
            hist.push(format!("ECHO {i}"));
        }
        assert_eq!(hist.len, HISTORY_CAPACITY);
        assert_eq!(
            hist.previous_command().cloned(),
            Some(format!("ECHO {}", HISTORY_CAPACITY + 4))
        );
    }

    #[test]
    fn test_dry_run_records_requests() {
        let mut shell = Shell {
            client: Client::new(ScriptedTransport::new()),
            json: false,
            dry_run: true,
        };
        assert_eq!(shell.run_line("SET k v EX 10"), Ok(true));
        assert_eq!(
            shell.client.transport().last_request().as_deref(),
            Some(r#"SET "k" "v" "EX" "10""#)
        );

        assert_eq!(shell.run_line("MULTI"), Ok(true));
        assert_eq!(shell.run_line("INCR n"), Ok(true));
        assert_eq!(shell.run_line("MULTI"), Err("a batch is already active".to_string()));
        assert_eq!(shell.run_line("DISCARD"), Ok(true));
        assert_eq!(shell.client.transport().call_count(), 1);

        assert_eq!(shell.run_line("quit"), Ok(false));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["kvbridge-cli", "--port", "7000", "--log-level", "debug"]);
        let config = cli.client_config().unwrap();
        assert_eq!(config.addresses[0].to_string(), "127.0.0.1:7000");
        assert_eq!(config.log_level, "debug");
        assert!(cli.command.is_empty());

        let cli = Cli::parse_from(["kvbridge-cli", "--dry-run", "GET", "k"]);
        assert!(cli.dry_run);
        assert_eq!(cli.command, vec!["GET", "k"]);

        let cli = Cli::parse_from(["kvbridge-cli", "--log-level", "loud"]);
        assert!(cli.client_config().is_err());
    }
}
