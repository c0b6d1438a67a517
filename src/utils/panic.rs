/// Installs a process-wide panic hook that logs the panic and exits.
///
/// A panic on a detached thread otherwise kills only that thread; the demos
/// would then keep printing as if nothing happened, which defeats their
/// point. Before exiting, the hook also names any replica threads still
/// parked mid-send, since a dying demo is the last chance to see them.
/// Not installed under test so the harness can catch panics itself.
#[cfg(not(test))]
pub fn exit_process_on_panic() {
  let original_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |panic_info| {
    original_hook(panic_info);
    let current = std::thread::current();
    let name = current.name().unwrap_or("unnamed");
    let parked = crate::pitfall::leak::parked_replicas();
    if log::log_enabled!(log::Level::Error) {
      log::error!(
        target: "crosstalk::panic",
        "unhandled panic on thread '{}': '{}'",
        name,
        panic_info
      );
      if !parked.is_empty() {
        log::error!(
          target: "crosstalk::panic",
          "exiting with {} sender(s) still parked: {:?}",
          parked.len(),
          parked
        );
      }
    } else {
      eprintln!("unhandled panic on thread '{}': '{}'", name, panic_info);
      if !parked.is_empty() {
        eprintln!("exiting with {} sender(s) still parked: {:?}", parked.len(), parked);
      }
    }
    std::process::exit(-1);
  }));
}

#[cfg(test)]
pub fn exit_process_on_panic() {}
