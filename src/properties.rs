//! Reader for the legacy `.properties` text format.
//!
//! The grammar is line oriented: logical lines are assembled from physical
//! lines (comments dropped, backslash continuations joined), each logical line
//! is split into a key and a value at the first unescaped separator, and both
//! halves are escape-decoded. Existing deployments depend on the exact
//! values produced, so the scanning rules below stay literal.
use std::{
    collections::HashMap,
    env,
    fs::File,
    io::{self, Read},
    path::Path,
};

use tracing::debug;

use crate::{
    constants::{ENV_PROPERTY_PREFIX, ENV_PROPERTY_SUFFIX, RESERVED_SYSTEM_PROPERTIES},
    error::{LauncherError, PropertiesError},
};

const READ_BUFFER_SIZE: usize = 8192;
const FORM_FEED: u8 = 0x0c;

fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == FORM_FEED
}

fn is_terminator(c: u8) -> bool {
    c == b'\r' || c == b'\n'
}

/// Splits a byte stream into logical lines.
///
/// Forward only: once a line has been yielded the underlying bytes are gone.
pub struct LineReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    limit: usize,
}

impl<R: Read> LineReader<R> {
    /// Wraps a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            limit: 0,
        }
    }

    fn fill(&mut self) -> io::Result<bool> {
        if self.pos < self.limit {
            return Ok(true);
        }
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(read) => {
                    self.pos = 0;
                    self.limit = read;
                    return Ok(read > 0);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    /// Consumes everything up to and including the next line terminator.
    fn skip_comment(&mut self) -> io::Result<()> {
        while self.fill()? {
            let window = &self.buf[self.pos..self.limit];
            match window.iter().position(|&b| is_terminator(b)) {
                Some(offset) => {
                    self.pos += offset + 1;
                    return Ok(());
                }
                None => self.pos = self.limit,
            }
        }
        Ok(())
    }

    /// Reads the next logical line, or `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let mut skip_whitespace = true;
        let mut appended_line_begin = false;
        let mut preceding_backslash = false;

        loop {
            let Some(c) = self.next_byte()? else {
                if line.is_empty() {
                    return Ok(None);
                }
                if preceding_backslash {
                    line.pop();
                }
                return Ok(Some(line));
            };

            if skip_whitespace {
                if is_whitespace(c) {
                    continue;
                }
                if !appended_line_begin && is_terminator(c) {
                    continue;
                }
                skip_whitespace = false;
                appended_line_begin = false;
            }

            if line.is_empty() && (c == b'#' || c == b'!') {
                self.skip_comment()?;
                skip_whitespace = true;
                continue;
            }

            if !is_terminator(c) {
                line.push(c);
                preceding_backslash = c == b'\\' && !preceding_backslash;
                continue;
            }

            if line.is_empty() {
                skip_whitespace = true;
                continue;
            }

            if !preceding_backslash {
                return Ok(Some(line));
            }

            // Continuation: the trailing backslash is not part of the line.
            line.pop();
            if self.peek_byte()?.is_none() {
                return Ok(Some(line));
            }
            skip_whitespace = true;
            appended_line_begin = true;
            preceding_backslash = false;
            if c == b'\r' && self.peek_byte()? == Some(b'\n') {
                self.pos += 1;
            }
        }
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}

/// Finds where the key ends and the value starts in a logical line.
fn split_key_value(line: &[u8]) -> (usize, usize) {
    let mut key_len = 0;
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    while key_len < line.len() {
        let c = line[key_len];
        if !preceding_backslash {
            if c == b'=' || c == b':' {
                value_start = key_len + 1;
                has_separator = true;
                break;
            }
            if is_whitespace(c) {
                value_start = key_len + 1;
                break;
            }
        }
        preceding_backslash = c == b'\\' && !preceding_backslash;
        key_len += 1;
    }

    while value_start < line.len() {
        let c = line[value_start];
        if !is_whitespace(c) {
            if !has_separator && (c == b'=' || c == b':') {
                has_separator = true;
            } else {
                break;
            }
        }
        value_start += 1;
    }

    (key_len, value_start)
}

fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        // Not UTF-8: fall back to one character per byte.
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Decodes backslash escapes in one key or value.
///
/// The raw bytes are turned into characters first, so `\uXXXX` output is
/// appended as characters and never re-read as part of the byte encoding.
pub fn decode_escapes(input: &[u8]) -> Result<String, PropertiesError> {
    let text = into_string(input.to_vec());
    if !text.contains('\\') {
        return Ok(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(escaped) = chars.next() else {
            break;
        };

        match escaped {
            'u' => {
                let mut value = 0;
                for _ in 0..4 {
                    let digit = chars
                        .next()
                        .and_then(|digit| digit.to_digit(16))
                        .ok_or(PropertiesError::MalformedEscape)?;
                    value = (value << 4) + digit;
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'n' => out.push('\n'),
            'f' => out.push(char::from(FORM_FEED)),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Parses a property stream into a mapping. Later duplicates overwrite earlier ones.
pub fn load<R: Read>(reader: R) -> Result<HashMap<String, String>, PropertiesError> {
    let mut properties = HashMap::new();
    for line in LineReader::new(reader) {
        let line = line?;
        let (key_len, value_start) = split_key_value(&line);
        let key = decode_escapes(&line[..key_len])?;
        let value = decode_escapes(&line[value_start..])?;
        properties.insert(key, value);
    }
    Ok(properties)
}

/// Parses a property file.
pub fn load_file(path: &Path) -> Result<HashMap<String, String>, PropertiesError> {
    debug!("Loading properties from {:?}", path);
    load(File::open(path)?)
}

/// Reads the logical lines of a file without splitting them into pairs.
pub fn load_lines(path: &Path) -> Result<Vec<String>, PropertiesError> {
    LineReader::new(File::open(path)?)
        .map(|line| line.map(into_string).map_err(PropertiesError::from))
        .collect()
}

/// Looks up a single key and resolves any `${ENV:NAME}` indirection.
pub fn resolve(path: &Path, key: &str) -> Result<String, LauncherError> {
    let properties = load_file(path).map_err(|source| LauncherError::ConfigRead {
        what: "properties file",
        path: path.to_path_buf(),
        source,
    })?;

    match properties.get(key) {
        Some(value) => decode_env_property(value),
        None => Err(LauncherError::MissingProperty {
            key: key.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

/// Replaces a `${ENV:NAME}` value with the environment variable `NAME`.
///
/// Any other value is returned unchanged.
pub fn decode_env_property(value: &str) -> Result<String, LauncherError> {
    let Some(rest) = value.strip_prefix(ENV_PROPERTY_PREFIX) else {
        return Ok(value.to_string());
    };
    let name = rest
        .strip_suffix(ENV_PROPERTY_SUFFIX)
        .ok_or_else(|| LauncherError::MalformedEnvProperty(value.to_string()))?;
    env::var(name).map_err(|_| LauncherError::MissingEnvironmentVariable(name.to_string()))
}

/// Parses `-D key=value` arguments.
pub fn parse_system_properties<S: AsRef<str>>(
    args: &[S],
) -> Result<HashMap<String, String>, LauncherError> {
    let mut properties = HashMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| LauncherError::MalformedSystemProperty(arg.to_string()))?;
        let key = key.trim();

        if let Some((_, flag)) = RESERVED_SYSTEM_PROPERTIES
            .iter()
            .find(|(reserved, _)| *reserved == key)
        {
            return Err(LauncherError::ReservedSystemProperty {
                key: key.to_string(),
                flag,
            });
        }

        properties.insert(key.to_string(), value.trim().to_string());
    }
    Ok(properties)
}
