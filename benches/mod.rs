use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use libmq::client::{Client, ConnectOptions, Message};
use libmq::packet::{Publish, QoS, topic_matches};
use libmq::time::Clock;
use libmq::transport::{Close, Connection, Read, Write};
use rand::RngCore;

struct BenchClock(Rc<Cell<u64>>);

impl Clock for BenchClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Loopback connection: every outbound publish is answered from a scripted
/// queue, so engine benchmarks run without a broker.
struct LoopbackConnection {
    clock: Rc<Cell<u64>>,
    inbound: VecDeque<u8>,
}

impl Read for LoopbackConnection {
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

impl Write for LoopbackConnection {
    type Error = ();

    fn write(&mut self, buf: &[u8], _timeout_ms: u32) -> Result<usize, ()> {
        Ok(buf.len())
    }
}

impl Close for LoopbackConnection {
    type Error = ();

    fn close(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

impl Connection for LoopbackConnection {}

fn random_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut payload);
    payload
}

pub fn bench_publish_encode(c: &mut Criterion) {
    let payload = random_payload(256);
    let packet = Publish {
        topic: "bench/publish/encode",
        payload: &payload,
        qos: QoS::AtLeastOnce,
        retained: false,
        duplicate: false,
        packet_id: 1,
    };
    let mut buf = [0u8; 512];

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("publish_encode_256b", |b| {
        b.iter(|| packet.encode(&mut buf).unwrap())
    });
    group.finish();
}

pub fn bench_publish_decode(c: &mut Criterion) {
    let payload = random_payload(256);
    let packet = Publish {
        topic: "bench/publish/decode",
        payload: &payload,
        qos: QoS::AtLeastOnce,
        retained: false,
        duplicate: false,
        packet_id: 1,
    };
    let mut buf = [0u8; 512];
    let len = packet.encode(&mut buf).unwrap();
    let frame = &buf[..len];

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("publish_decode_256b", |b| {
        b.iter(|| Publish::decode(frame).unwrap())
    });
    group.finish();
}

pub fn bench_topic_matching(c: &mut Criterion) {
    c.bench_function("topic_match_wildcards", |b| {
        b.iter(|| {
            topic_matches("devices/+/sensors/#", "devices/42/sensors/temp/celsius")
        })
    });
}

fn noop(_: &Message<'_>) {}

pub fn bench_publish_qos0(c: &mut Criterion) {
    let clock = Rc::new(Cell::new(1_000u64));
    let mut conn = LoopbackConnection {
        clock: clock.clone(),
        inbound: VecDeque::new(),
    };
    conn.inbound.extend([0x20, 0x02, 0x00, 0x00]); // CONNACK
    let mut send_buf = [0u8; 512];
    let mut read_buf = [0u8; 512];
    let mut client: Client<'_, _, _, 8> =
        Client::new(conn, BenchClock(clock), &mut send_buf, &mut read_buf, 1_000);
    client.set_default_handler(noop);
    client.connect(&ConnectOptions::new("bench-client")).unwrap();

    let payload = random_payload(64);
    c.bench_function("publish_qos0", |b| {
        b.iter(|| {
            client
                .publish("bench/qos0", &payload, QoS::AtMostOnce, false)
                .unwrap()
        })
    });
}

pub fn bench_dispatch_cycle(c: &mut Criterion) {
    let clock = Rc::new(Cell::new(1_000u64));
    let mut conn = LoopbackConnection {
        clock: clock.clone(),
        inbound: VecDeque::new(),
    };
    conn.inbound.extend([0x20, 0x02, 0x00, 0x00]); // CONNACK
    let mut send_buf = [0u8; 512];
    let mut read_buf = [0u8; 512];
    let mut client: Client<'_, _, _, 8> =
        Client::new(conn, BenchClock(clock), &mut send_buf, &mut read_buf, 1_000);
    client.set_default_handler(noop);
    client.connect(&ConnectOptions::new("bench-client")).unwrap();

    let payload = random_payload(64);
    let inbound = {
        let packet = Publish {
            topic: "bench/dispatch",
            payload: &payload,
            qos: QoS::AtMostOnce,
            retained: false,
            duplicate: false,
            packet_id: 0,
        };
        let mut buf = [0u8; 512];
        let len = packet.encode(&mut buf).unwrap();
        buf[..len].to_vec()
    };

    c.bench_function("dispatch_inbound_publish", |b| {
        b.iter(|| {
            client.transport_mut().inbound.extend(inbound.iter().copied());
            client.process(1).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_publish_encode,
    bench_publish_decode,
    bench_topic_matching,
    bench_publish_qos0,
    bench_dispatch_cycle
);
criterion_main!(benches);
