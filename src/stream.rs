// ── Stream adapter ────────────────────────────────────────────────────────────
//
// `fopen`-style opening: a mode string such as `"rb+"` is parsed into
// `OpenFlags`, the file is opened through `Opener::open`, and the descriptor
// is wrapped in a buffered `Stream`.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, Read, Seek, SeekFrom, Write},
    str::FromStr,
};

use crate::{
    error::{OpenError, Result},
    flags::OpenFlags,
    platform::Descriptor,
};

/// Buffer size for both directions, matching `std::io::BufReader`.
const BUF_CAPACITY: usize = 8 * 1024;

// ── Mode strings ──────────────────────────────────────────────────────────────

/// A parsed `fopen` mode string.
///
/// | First char | Flags |
/// |---|---|
/// | `r` | read |
/// | `w` | create + write + truncate |
/// | `a` | create + write + append |
///
/// Then any number of `+` (read-write) and `b` (binary), in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMode {
    flags: OpenFlags,
    text: String,
}

impl StreamMode {
    /// Parse `mode`.  Anything malformed is `OpenError::InvalidMode`.
    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = || OpenError::InvalidMode { mode: mode.to_owned() };

        let mut chars = mode.chars();
        let mut flags = match chars.next() {
            Some('r') => OpenFlags::READ,
            Some('w') => OpenFlags::CREATE | OpenFlags::WRITE | OpenFlags::TRUNCATE,
            Some('a') => OpenFlags::CREATE | OpenFlags::WRITE | OpenFlags::APPEND,
            _ => return Err(invalid()),
        };

        for c in chars {
            match c {
                '+' => flags = flags.into_read_write(),
                'b' => flags |= OpenFlags::BINARY,
                _ => return Err(invalid()),
            }
        }

        Ok(Self {
            flags,
            text: mode.to_owned(),
        })
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// The mode string as given.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_readable(&self) -> bool {
        self.flags.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.flags.is_writable()
    }

    pub fn is_append(&self) -> bool {
        self.flags.contains(OpenFlags::APPEND)
    }

    pub fn is_binary(&self) -> bool {
        self.flags.contains(OpenFlags::BINARY)
    }
}

impl FromStr for StreamMode {
    type Err = OpenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Stream ────────────────────────────────────────────────────────────────────

/// A buffered file stream, the counterpart of a C `FILE *`.
///
/// Reads and writes share one position.  Switching from reading to writing
/// gives back unread read-ahead to the OS; switching from writing to reading
/// flushes first.  Reading a write-only stream or writing a read-only one
/// fails immediately.  In append modes every flush lands at end-of-file.
/// Dropping the stream flushes (errors are discarded) and closes the
/// descriptor; call [`Stream::flush`] first to observe them.
pub struct Stream {
    /// `None` only once `into_file` has taken it.
    file: Option<File>,
    mode: StreamMode,
    /// Read-ahead; `rbuf[rpos..]` has not been consumed yet.
    rbuf: Vec<u8>,
    rpos: usize,
    /// Bytes written but not yet handed to the OS.
    wbuf: Vec<u8>,
}

impl Stream {
    /// Wrap an open descriptor (`fdopen`).  The stream takes ownership.
    pub fn from_descriptor(descriptor: Descriptor, mode: StreamMode) -> Self {
        Self {
            file: Some(File::from(descriptor)),
            mode,
            rbuf: Vec::new(),
            rpos: 0,
            wbuf: Vec::new(),
        }
    }

    pub fn mode(&self) -> &StreamMode {
        &self.mode
    }

    /// The underlying file.  Buffered data is not visible through it.
    pub fn get_ref(&self) -> &File {
        self.file.as_ref().expect("stream file taken only by into_file")
    }

    fn file(&mut self) -> &mut File {
        self.file.as_mut().expect("stream file taken only by into_file")
    }

    /// Flush and give up the buffers, returning the file at the logical
    /// stream position.
    pub fn into_file(mut self) -> io::Result<File> {
        self.flush_writes()?;
        self.discard_read_ahead()?;
        Ok(self.file.take().expect("stream file taken only by into_file"))
    }

    /// Hand buffered writes to the OS.  On failure the unwritten tail stays
    /// buffered so a later flush can retry it.
    fn flush_writes(&mut self) -> io::Result<()> {
        if self.wbuf.is_empty() {
            return Ok(());
        }
        if self.mode.is_append() {
            self.file().seek(SeekFrom::End(0))?;
        }

        let mut written = 0;
        let result = loop {
            if written == self.wbuf.len() {
                break Ok(());
            }
            let file = self.file.as_mut().expect("stream file taken only by into_file");
            match file.write(&self.wbuf[written..]) {
                Ok(0) => break Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.wbuf.drain(..written);
        result
    }

    /// Seek the OS position back over read-ahead nobody consumed.
    fn discard_read_ahead(&mut self) -> io::Result<()> {
        let unread = self.rbuf.len() - self.rpos;
        self.rbuf.clear();
        self.rpos = 0;
        if unread > 0 {
            self.file().seek(SeekFrom::Current(-(unread as i64)))?;
        }
        Ok(())
    }

    fn require(&self, allowed: bool, direction: &str) -> io::Result<()> {
        if allowed {
            return Ok(());
        }
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("stream opened {:?} is not {direction}", self.mode.as_str()),
        ))
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("file", &self.file)
            .field("mode", &self.mode.as_str())
            .field("buffered_read", &(self.rbuf.len() - self.rpos))
            .field("buffered_write", &self.wbuf.len())
            .finish()
    }
}

impl Read for Stream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.require(self.mode.is_readable(), "readable")?;
        self.flush_writes()?;
        // Large reads with nothing buffered bypass the buffer.
        if self.rpos == self.rbuf.len() && out.len() >= BUF_CAPACITY {
            return self.file().read(out);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for Stream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.require(self.mode.is_readable(), "readable")?;
        self.flush_writes()?;
        if self.rpos == self.rbuf.len() {
            self.rbuf.resize(BUF_CAPACITY, 0);
            let file = self.file.as_mut().expect("stream file taken only by into_file");
            let n = match file.read(&mut self.rbuf) {
                Ok(n) => n,
                Err(e) => {
                    self.rbuf.clear();
                    self.rpos = 0;
                    return Err(e);
                }
            };
            self.rbuf.truncate(n);
            self.rpos = 0;
        }
        Ok(&self.rbuf[self.rpos..])
    }

    fn consume(&mut self, amt: usize) {
        self.rpos = (self.rpos + amt).min(self.rbuf.len());
    }
}

impl Write for Stream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.require(self.mode.is_writable(), "writable")?;
        if !self.rbuf.is_empty() {
            self.discard_read_ahead()?;
        }
        if self.wbuf.len() + data.len() > BUF_CAPACITY {
            self.flush_writes()?;
        }
        if self.wbuf.is_empty() && data.len() >= BUF_CAPACITY {
            if self.mode.is_append() {
                self.file().seek(SeekFrom::End(0))?;
            }
            return self.file().write(data);
        }
        self.wbuf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_writes()?;
        self.file().flush()
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.flush_writes()?;
        // Relative seeks are relative to the logical position, which trails
        // the OS position by the unread read-ahead.
        self.discard_read_ahead()?;
        self.file().seek(pos)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.flush_writes();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
