use std::time::Duration;

use application::{KeyEvent, KeystrokeDisambiguator, PackageLabelRequest, PrintRequest};
use domain::{Key, ScanEvent};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One line of operator input on stdin
///
/// ```text
/// {"cmd":"key","key":"A","at_ms":1000}
/// {"cmd":"print","order_number":"ORD-1","sequence":1,"total":2,"description":"Bolts"}
/// {"cmd":"connect_scale","port":"COM4"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum OperatorInput {
    /// Raw keystroke from the keyboard wedge. Without `at_ms` the arrival
    /// time of the line is used.
    Key {
        key: String,
        #[serde(default)]
        at_ms: Option<u64>,
    },
    /// Label for the active scan
    Print(PrintRequest),
    /// Label with every field given explicitly
    PrintLabel(PackageLabelRequest),
    PrintTest,
    Tare,
    Weight,
    ConnectScale {
        #[serde(default)]
        port: Option<String>,
    },
    DisconnectScale,
    ConnectPrinter,
    DisconnectPrinter,
    ClearScan,
    Status,
}

pub fn parse_line(line: &str) -> Result<OperatorInput, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Map a key name from the input stream to a [`Key`]
pub fn parse_key(name: &str) -> Key {
    match name {
        "Enter" | "enter" | "\n" | "\r" => Key::Enter,
        "Tab" | "tab" | "\t" => Key::Tab,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => Key::Other,
            }
        }
    }
}

/// A line of operator input, stamped when it was read
#[derive(Debug, Clone, PartialEq)]
pub struct InputLine {
    pub text: String,
    /// Time since the reader started
    pub received: Duration,
}

/// Read lines and stamp each one on arrival.
///
/// Runs on its own task: however long a device command takes elsewhere,
/// keystroke timing is taken here and never from the point of processing.
pub async fn read_lines<R>(reader: R, lines_tx: mpsc::UnboundedSender<InputLine>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let started = Instant::now();
    let mut lines = BufReader::new(reader).lines();

    while let Some(text) = lines.next_line().await? {
        let received = started.elapsed();
        if lines_tx.send(InputLine { text, received }).is_err() {
            break;
        }
    }
    Ok(())
}

/// Where a line of input goes next
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Scan(ScanEvent),
    Command(OperatorInput),
}

/// Splits input into scans and device commands. Never touches a device.
pub struct InputRouter {
    disambiguator: KeystrokeDisambiguator,
}

impl InputRouter {
    pub fn new(disambiguator: KeystrokeDisambiguator) -> Self {
        Self { disambiguator }
    }

    pub fn route(&mut self, line: &InputLine) -> Result<Option<Routed>, serde_json::Error> {
        if line.text.trim().is_empty() {
            return Ok(None);
        }
        match parse_line(&line.text)? {
            OperatorInput::Key { key, at_ms } => {
                let at = at_ms.map(Duration::from_millis).unwrap_or(line.received);
                let scan = self.disambiguator.feed(KeyEvent::new(parse_key(&key), at));
                Ok(scan.map(Routed::Scan))
            }
            command => Ok(Some(Routed::Command(command))),
        }
    }
}
