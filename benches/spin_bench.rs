#![feature(test)]
use crosstalk::pitfall::spin::{blocking_recv, poll_recv};

extern crate test;
use test::Bencher;

use crossbeam_channel::bounded;

#[bench]
fn poll_recv_ready_benchmark(bencher: &mut Bencher) {
  let (tx, rx) = bounded(1);
  bencher.iter(|| {
    tx.send(1).unwrap();
    assert_eq!(poll_recv(&rx).unwrap().value, 1);
  })
}

#[bench]
fn blocking_recv_ready_benchmark(bencher: &mut Bencher) {
  let (tx, rx) = bounded(1);
  bencher.iter(|| {
    tx.send(1).unwrap();
    assert_eq!(blocking_recv(&rx).unwrap().value, 1);
  })
}
