//! Shared test doubles: a scripted in-memory connection and a manually
//! advanced clock.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use libmq::time::Clock;
use libmq::transport::{Close, Connect, Connection, Read, Write};

/// A clock the test (and the mock connection) advances by hand.
#[derive(Debug, Clone)]
pub struct MockClock(pub Rc<Cell<u64>>);

impl MockClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(1_000)))
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// A connection serving a scripted inbound byte stream and recording every
/// outbound byte.
///
/// A read against an empty script advances the shared clock by the full
/// timeout, the way a real blocking socket burns wall-clock time, so
/// engine wait loops terminate.
#[derive(Debug)]
pub struct MockConnection {
    clock: Rc<Cell<u64>>,
    inbound: VecDeque<u8>,
    pub written: Vec<u8>,
    /// Number of upcoming write calls that fail with a transport error.
    pub fail_writes: usize,
    pub closed: bool,
}

impl MockConnection {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.0.clone(),
            inbound: VecDeque::new(),
            written: Vec::new(),
            fail_writes: 0,
            closed: false,
        }
    }

    /// Queue a framed packet for the engine to read.
    pub fn push_inbound(&mut self, frame: &[u8]) {
        self.inbound.extend(frame);
    }

    /// Count occurrences of a fixed-header byte at frame boundaries in the
    /// recorded outbound stream.
    pub fn count_written(&self, first_byte: u8) -> usize {
        // Outbound packets from the engine are framed back to back; walk
        // them using the remaining-length field.
        let mut count = 0;
        let mut i = 0;
        while i + 1 < self.written.len() {
            if self.written[i] == first_byte {
                count += 1;
            }
            let mut remaining = 0usize;
            let mut multiplier = 1usize;
            let mut len_bytes = 0;
            loop {
                let byte = self.written[i + 1 + len_bytes];
                remaining += (byte & 0x7F) as usize * multiplier;
                multiplier *= 128;
                len_bytes += 1;
                if byte & 0x80 == 0 {
                    break;
                }
            }
            i += 1 + len_bytes + remaining;
        }
        count
    }
}

impl Read for MockConnection {
    type Error = ();

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, ()> {
        if self.inbound.is_empty() {
            self.clock.set(self.clock.get() + u64::from(timeout_ms));
            return Ok(0);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockConnection {
    type Error = ();

    fn write(&mut self, buf: &[u8], _timeout_ms: u32) -> Result<usize, ()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(());
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }
}

impl Close for MockConnection {
    type Error = ();

    fn close(&mut self) -> Result<(), ()> {
        self.closed = true;
        Ok(())
    }
}

impl Connection for MockConnection {}

/// A dialer handing out fresh [`MockConnection`]s preloaded with a scripted
/// inbound stream.
#[derive(Debug)]
pub struct MockDialer {
    clock: MockClock,
    pub script: Vec<u8>,
    pub dial_count: usize,
    pub fail_dials: usize,
}

impl MockDialer {
    pub fn new(clock: &MockClock, script: &[u8]) -> Self {
        Self {
            clock: clock.clone(),
            script: script.to_vec(),
            dial_count: 0,
            fail_dials: 0,
        }
    }
}

impl Connect for MockDialer {
    type Connection = MockConnection;
    type Error = ();

    fn connect(&mut self, _remote: &str) -> Result<MockConnection, ()> {
        self.dial_count += 1;
        if self.fail_dials > 0 {
            self.fail_dials -= 1;
            return Err(());
        }
        let mut conn = MockConnection::new(&self.clock);
        conn.push_inbound(&self.script);
        Ok(conn)
    }
}

/// CONNACK, session-present clear, accepted.
pub const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
