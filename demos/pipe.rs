//! Example Pipe (Producer/Consumer)
//!
//! A producer thread streams numbered records through one ring while a
//! consumer thread drains them. The ring itself is unsynchronized; both
//! sides go through a `Mutex` supplied here.

use mirror_ring::{RingBuffer, RingConfig};
use std::sync::{Arc, Mutex};
use std::thread;

const RECORDS: u64 = 100_000;
const RECORD_LEN: usize = 8;

fn main() {
    let exponent = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(16);

    println!("[Pipe] Ring of 2^{} bytes, {} records", exponent, RECORDS);

    let config = RingConfig::new(exponent).with_label("pipe-demo");
    let ring = match RingBuffer::with_config(&config) {
        Ok(r) => Arc::new(Mutex::new(r)),
        Err(e) => {
            eprintln!("[Pipe] Failed to create ring: {}", e);
            std::process::exit(1);
        }
    };

    let start = std::time::Instant::now();

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut next = 0u64;
            while next < RECORDS {
                let mut ring = ring.lock().unwrap();
                // Fill whatever space there is, straight into the ring
                while next < RECORDS && ring.free() >= RECORD_LEN {
                    ring.write_slice()[..RECORD_LEN].copy_from_slice(&next.to_le_bytes());
                    ring.commit_write(RECORD_LEN).unwrap();
                    next += 1;
                }
                drop(ring);
                thread::yield_now();
            }
        })
    };

    let consumer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut expected = 0u64;
            let mut record = [0u8; RECORD_LEN];
            while expected < RECORDS {
                let mut ring = ring.lock().unwrap();
                while ring.used() >= RECORD_LEN {
                    ring.read_into(&mut record);
                    let value = u64::from_le_bytes(record);
                    assert_eq!(value, expected, "records out of order");
                    expected += 1;
                }
                drop(ring);
                thread::yield_now();
            }
            expected
        })
    };

    producer.join().unwrap();
    let received = consumer.join().unwrap();

    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "[Pipe] Received {} records in {:.3}s ({:.1} MB/s)",
        received,
        elapsed,
        (received as f64 * RECORD_LEN as f64) / elapsed / 1e6
    );
}
