//! Makes each pitfall's damage visible on stdout.

use crosstalk::pitfall::clone_lock::{stampede, Forked, Shared};
use crosstalk::pitfall::leak::{leaky_first_response, parked_replicas};
use crosstalk::pitfall::spin::{blocking_recv, delayed_send, poll_recv};

use std::thread;
use std::time::Duration;

fn main() {
  crosstalk::utils::panic::exit_process_on_panic();

  let (winner, probe) = leaky_first_response(8, |i| {
    thread::sleep(Duration::from_millis(5 * i as u64));
    format!("response from replica {}", i)
  });
  println!("took '{}' and moved on", winner);
  thread::sleep(Duration::from_millis(100));
  println!("threads still parked on their send: {}", probe.parked());
  for name in parked_replicas() {
    println!("  {}", name);
  }
  probe.release();
  println!("probe dropped, parked senders released");

  println!();
  let rx = delayed_send(42, Duration::from_millis(20));
  let polled = poll_recv(&rx).unwrap();
  println!("busy poll got {} after {} polls", polled.value, polled.polls);
  let rx = delayed_send(42, Duration::from_millis(20));
  let polled = blocking_recv(&rx).unwrap();
  println!("blocking receive got {} after {} poll", polled.value, polled.polls);

  println!();
  println!("shared lock counted {} of 8000 bumps", stampede(Shared::new(), 8, 1000));
  println!("forked lock counted {} of 8000 bumps", stampede(Forked::new(), 8, 1000));
}
