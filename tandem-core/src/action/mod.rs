//! Action execution: key names, profiles, desktop seams and the executor.

pub mod desktop;
pub mod executor;
pub mod key;
pub mod profile;

pub use desktop::{KeyInput, WindowFocus};
pub use executor::{ActionExecutor, InputGuard};
pub use key::Key;
pub use profile::{
    ActionProfile, ActionProfiles, IDLE_ACTION, Target, Timing, default_profiles,
    default_targets,
};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{Key, KeyInput, Target, WindowFocus};
    use crate::error::ActionError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Focus(String),
        Down(Key),
        Up(Key),
    }

    /// Desktop double that records every call with its (tokio) timestamp.
    #[derive(Default)]
    pub struct Recorder {
        log: Mutex<Vec<(Instant, Event)>>,
        clicks: Mutex<Vec<(i32, i32)>>,
        refuse_focus: Mutex<HashSet<String>>,
        fail_keys: AtomicBool,
    }

    impl Recorder {
        pub fn events(&self) -> Vec<Event> {
            self.log.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
        }

        pub fn timed_events(&self) -> Vec<(Instant, Event)> {
            self.log.lock().unwrap().clone()
        }

        pub fn clicks(&self) -> Vec<(i32, i32)> {
            self.clicks.lock().unwrap().clone()
        }

        pub fn focused(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Focus(t) => Some(t),
                    _ => None,
                })
                .collect()
        }

        /// Time between each key-down and its key-up.
        pub fn hold_times(&self) -> Vec<Duration> {
            let log = self.timed_events();
            let mut holds = Vec::new();
            for (i, (down_at, event)) in log.iter().enumerate() {
                if let Event::Down(key) = event {
                    if let Some((up_at, _)) = log[i + 1..]
                        .iter()
                        .find(|(_, e)| *e == Event::Up(*key))
                    {
                        holds.push(*up_at - *down_at);
                    }
                }
            }
            holds
        }

        pub fn refuse_focus(&self, target: &str) {
            self.refuse_focus.lock().unwrap().insert(target.to_string());
        }

        pub fn fail_keys(&self) {
            self.fail_keys.store(true, Ordering::SeqCst);
        }

        fn record(&self, event: Event) {
            self.log.lock().unwrap().push((Instant::now(), event));
        }
    }

    impl WindowFocus for Recorder {
        fn focus(&self, target: &Target, x: i32, y: i32) -> Result<(), ActionError> {
            if self.refuse_focus.lock().unwrap().contains(&target.id) {
                return Err(ActionError::Focus {
                    target: target.id.clone(),
                    reason: "refused".into(),
                });
            }
            self.clicks.lock().unwrap().push((x, y));
            self.record(Event::Focus(target.id.clone()));
            Ok(())
        }
    }

    impl KeyInput for Recorder {
        fn key_down(&self, key: Key) -> Result<(), ActionError> {
            if self.fail_keys.load(Ordering::SeqCst) {
                return Err(ActionError::Input("device unplugged".into()));
            }
            self.record(Event::Down(key));
            Ok(())
        }

        fn key_up(&self, key: Key) -> Result<(), ActionError> {
            self.record(Event::Up(key));
            Ok(())
        }
    }
}
