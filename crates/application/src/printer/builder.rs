use domain::PrintJob;

const LINE_WIDTH: usize = 40;

/// ESC/POS command stream for thermal label printers
pub struct LabelBuilder {
    buffer: Vec<u8>,
}

impl Default for LabelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelBuilder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Complete package label for one piece of an order
    pub fn package_label(job: &PrintJob) -> Vec<u8> {
        let description = if job.description.trim().is_empty() {
            "-"
        } else {
            job.description.as_str()
        };

        Self::new()
            .initialize()
            .align_center()
            .bold(true)
            .text_line("PACKAGE")
            .bold(false)
            .barcode(&job.package_number)
            .empty_line()
            .align_left()
            .separator()
            .kv("Package", &job.package_number)
            .kv("Order", &job.order_number)
            .kv("Piece", &format!("{} of {}", job.sequence, job.total))
            .kv("Weight", &format!("{:.3} kg", job.weight))
            .kv("Contents", description)
            .separator()
            .feed(3)
            .cut()
            .build()
    }

    /// Self-test label used to check paper, alignment and cutter
    pub fn test_label(station_id: &str, printed_at: &str) -> Vec<u8> {
        Self::new()
            .initialize()
            .align_center()
            .bold(true)
            .text_line("PRINTER TEST")
            .bold(false)
            .separator()
            .align_left()
            .kv("Station", station_id)
            .kv("Printed", printed_at)
            .separator()
            .feed(3)
            .cut()
            .build()
    }

    pub fn initialize(mut self) -> Self {
        // ESC @: Initialize printer
        self.buffer.extend_from_slice(&[0x1B, 0x40]);
        self
    }

    pub fn align_center(mut self) -> Self {
        // ESC a n: Align (0: Left, 1: Center, 2: Right)
        self.buffer.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn align_left(mut self) -> Self {
        self.buffer.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    pub fn bold(mut self, on: bool) -> Self {
        // ESC E n
        self.buffer.extend_from_slice(&[0x1B, 0x45, u8::from(on)]);
        self
    }

    pub fn text_line(mut self, text: &str) -> Self {
        self.push_text(text);
        self.buffer.push(0x0A); // LF
        self
    }

    pub fn empty_line(mut self) -> Self {
        self.buffer.push(0x0A);
        self
    }

    pub fn separator(self) -> Self {
        self.text_line(&"-".repeat(LINE_WIDTH))
    }

    pub fn kv(self, key: &str, value: &str) -> Self {
        let line = format!("{:<12}: {}", key, value);
        self.text_line(&line)
    }

    /// CODE128 barcode with the human readable text printed below
    pub fn barcode(mut self, data: &str) -> Self {
        // GS h n: height in dots, GS w n: module width, GS H n: HRI position
        self.buffer
            .extend_from_slice(&[0x1D, 0x68, 80, 0x1D, 0x77, 2, 0x1D, 0x48, 2]);

        // GS k 73 n d1..dn, prefixed with "{B" to select code set B
        let mut payload: Vec<u8> = b"{B".to_vec();
        payload.extend(data.chars().map(printable_byte).take(253));
        self.buffer.extend_from_slice(&[0x1D, 0x6B, 73, payload.len() as u8]);
        self.buffer.extend_from_slice(&payload);
        self.buffer.push(0x0A);
        self
    }

    pub fn feed(mut self, n: u8) -> Self {
        // ESC d n: Print and feed n lines
        self.buffer.extend_from_slice(&[0x1B, 0x64, n]);
        self
    }

    pub fn cut(mut self) -> Self {
        // GS V 66 0: feed to cut position and cut
        self.buffer.extend_from_slice(&[0x1D, 0x56, 66, 0]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }

    fn push_text(&mut self, text: &str) {
        self.buffer.extend(text.chars().map(printable_byte));
    }
}

/// Printers run in a single-byte code page; anything else prints as '?'
fn printable_byte(c: char) -> u8 {
    if c.is_ascii() && !c.is_ascii_control() {
        c as u8
    } else {
        b'?'
    }
}
