//! Line-oriented configuration reader.
//!
//! A file is read twice: the first pass echoes every line to the trace log,
//! the second parses it. Both passes go through [`ConfigLines`] so they see
//! the same lines, truncated at the same length.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};

use crate::error::ConfigError;
use crate::params::ParameterStore;
use crate::sections::{default_chain, ParseContext, Recognized, SectionParser};
use crate::tokens::{strip_eol, Tokens};

/// Size of the configuration line buffer, terminator included.
pub const CONF_LINELEN: usize = 512;

/// What the dispatcher did with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line, comment, or a line without `=`.
    Skipped,
    /// A recognizer took the line; carries its section tag.
    Handled(&'static str),
    /// No recognizer knows the keyword.
    Unknown,
}

/// Iterator over the lines of a configuration source, EOL stripped and
/// truncated to `CONF_LINELEN - 1` bytes.
pub struct ConfigLines<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> ConfigLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(CONF_LINELEN),
            line_no: 0,
        }
    }

    /// Number of lines read so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for ConfigLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                let text = String::from_utf8_lossy(&self.buf);
                let line = strip_eol(&text);
                let max = CONF_LINELEN - 1;
                if line.len() > max {
                    warn!("Config line {} too long, truncated", self.line_no);
                    let mut end = max;
                    while !line.is_char_boundary(end) {
                        end -= 1;
                    }
                    return Some(Ok(line[..end].to_string()));
                }
                Some(Ok(line.to_string()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Routes configuration lines to the first recognizer that owns their keyword.
pub struct ConfigDispatcher {
    parsers: Vec<Box<dyn SectionParser>>,
    /// Channel opened by the last `new_channel`.
    current: Option<usize>,
}

impl Default for ConfigDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigDispatcher {
    /// Dispatcher with every subsystem recognizer in priority order.
    pub fn new() -> Self {
        Self::with_parsers(default_chain())
    }

    pub fn with_parsers(parsers: Vec<Box<dyn SectionParser>>) -> Self {
        Self {
            parsers,
            current: None,
        }
    }

    /// Index of the channel directives currently apply to.
    pub fn current_channel(&self) -> Option<usize> {
        self.current
    }

    /// Parse a single raw line into `store`.
    pub fn dispatch_line(
        &mut self,
        store: &mut ParameterStore,
        raw: &str,
    ) -> Result<LineOutcome, ConfigError> {
        let line = strip_eol(raw);
        if line.starts_with('#') {
            return Ok(LineOutcome::Skipped);
        }

        let mut tokens = Tokens::new(line);
        let keyword = match tokens.next_token() {
            Some(keyword) => keyword,
            None => return Ok(LineOutcome::Skipped),
        };
        if keyword.starts_with('#') {
            return Ok(LineOutcome::Skipped);
        }
        // Only new_channel stands on its own; other lines need a value.
        if !line.contains('=') && keyword != "new_channel" {
            return Ok(LineOutcome::Skipped);
        }

        let mut ctx = ParseContext::new(store, self.current);
        for parser in &self.parsers {
            let answer = parser.try_parse(&mut ctx, keyword, &mut tokens);
            self.current = ctx.current;
            if answer? == Recognized::Handled {
                debug!("[{}] {}", parser.section(), keyword);
                return Ok(LineOutcome::Handled(parser.section()));
            }
        }

        if line.trim().len() > 1 {
            warn!("Config issue : unknow symbol : {}", keyword);
        }
        Ok(LineOutcome::Unknown)
    }

    /// Parse every line of `reader`.
    pub fn parse_reader<R: BufRead>(
        &mut self,
        store: &mut ParameterStore,
        reader: R,
    ) -> Result<(), ConfigError> {
        self.parse_lines(store, reader, Path::new("-"))
    }

    /// Echo then parse the configuration file at `path`.
    pub fn parse_file(
        &mut self,
        store: &mut ParameterStore,
        path: impl AsRef<Path>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        trace!("Full configuration file :");
        {
            let mut lines = ConfigLines::new(BufReader::new(&file));
            while let Some(line) = lines.next() {
                let line = line.map_err(|source| read_error(path, lines.line_no(), source))?;
                trace!("{:03} {}", lines.line_no(), line);
            }
        }
        file.rewind().map_err(|source| read_error(path, 0, source))?;

        self.parse_lines(store, BufReader::new(file), path)
    }

    fn parse_lines<R: BufRead>(
        &mut self,
        store: &mut ParameterStore,
        reader: R,
        path: &Path,
    ) -> Result<(), ConfigError> {
        let mut lines = ConfigLines::new(reader);
        while let Some(line) = lines.next() {
            let line = line.map_err(|source| read_error(path, lines.line_no(), source))?;
            self.dispatch_line(store, &line)?;
        }
        Ok(())
    }
}

fn read_error(path: &Path, line: usize, source: io::Error) -> ConfigError {
    ConfigError::Read {
        path: PathBuf::from(path),
        line,
        source,
    }
}
