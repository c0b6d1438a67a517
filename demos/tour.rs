//! Runs the three exercises end to end and prints what they produce.

use crosstalk::exercise::crawler::{crawl, MapFetcher};
use crosstalk::exercise::digest::digest_dir;
use crosstalk::exercise::tree::{same, Tree};

use std::sync::Arc;

fn main() {
  crosstalk::utils::panic::exit_process_on_panic();

  let (a, b) = (Tree::shuffled(1), Tree::shuffled(1));
  println!("tree a holds {:?}", a.in_order());
  println!("tree b holds {:?}", b.in_order());
  println!("same(a, b) = {}", same(a, b));
  println!("same(shuffled(1), shuffled(2)) = {}", same(Tree::shuffled(1), Tree::shuffled(2)));

  println!();
  for page in crawl("https://example.org/", 4, Arc::new(MapFetcher::sample())) {
    println!("crawled {} ({} bytes of body)", page.url, page.body.len());
  }

  println!();
  let root = std::env::args().nth(1).unwrap_or_else(|| "src".to_owned());
  match digest_dir(root.as_ref()) {
    Ok(sums) => {
      for (path, sum) in &sums {
        println!("{}  {}", sum, path.display());
      }
    }
    Err(error) => eprintln!("digest of {} failed: {}", root, error),
  }
}
