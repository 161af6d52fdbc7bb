//! Thumbnail loading: the per-image fallback ladder.
//!
//! A thumbnail is tried with up to three request modes before the card
//! degrades to text only:
//!
//! ```text
//! unset -> loading(A) -> loaded
//!                     -> loading(B) -> loaded                  (B only for matched hosts)
//!                                   -> loading(crossorigin) -> loaded
//!                                                           -> fallback
//! ```
//!
//! The state machine is plain data; [`run_ladder`] drives it against an
//! [`ImageProbe`].

pub mod probe;

pub use probe::{HttpImageProbe, ImageProbe, NoopImageProbe};

/// Referrer policy used for an image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerPolicy {
    /// Send only the page origin as referrer
    Origin,
    /// Send no referrer at all
    NoReferrer,
}

impl ReferrerPolicy {
    /// Attribute value for `referrerpolicy`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferrerPolicy::Origin => "origin",
            ReferrerPolicy::NoReferrer => "no-referrer",
        }
    }
}

/// Request mode of one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub referrer_policy: ReferrerPolicy,
    /// `crossorigin="anonymous"`
    pub cross_origin: bool,
}

/// State of one card image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLoadState {
    /// No source assigned
    Unset,
    Loading(Attempt),
    Loaded(Attempt),
    /// Every attempt failed; the card shows no thumbnail
    Fallback,
}

impl ImageLoadState {
    /// Value of the `data-image-state` attribute.
    pub fn label(&self) -> &'static str {
        match self {
            ImageLoadState::Unset => "unset",
            ImageLoadState::Loading(_) => "loading",
            ImageLoadState::Loaded(_) => "loaded",
            ImageLoadState::Fallback => "fallback",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageLoadState::Loaded(_) | ImageLoadState::Fallback)
    }

    /// The request mode currently applied to the element, if any.
    pub fn attempt(&self) -> Option<Attempt> {
        match self {
            ImageLoadState::Loading(a) | ImageLoadState::Loaded(a) => Some(*a),
            _ => None,
        }
    }
}

/// Hosts that need the `origin` referrer on the first attempt.
///
/// Matching is a substring test on the image URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerRule {
    pub hosts: Vec<String>,
}

impl ReferrerRule {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn applies(&self, src: &str) -> bool {
        self.hosts.iter().any(|h| !h.is_empty() && src.contains(h.as_str()))
    }

    pub fn initial_policy(&self, src: &str) -> ReferrerPolicy {
        if self.applies(src) {
            ReferrerPolicy::Origin
        } else {
            ReferrerPolicy::NoReferrer
        }
    }
}

/// One card image and its position on the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLoader {
    src: String,
    host_matched: bool,
    state: ImageLoadState,
    error_handler_armed: bool,
}

impl ImageLoader {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            host_matched: false,
            state: ImageLoadState::Unset,
            error_handler_armed: false,
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn state(&self) -> ImageLoadState {
        self.state
    }

    /// Whether a failed load would still be acted upon.
    pub fn error_handler_armed(&self) -> bool {
        self.error_handler_armed
    }

    /// Assign the source and begin the first attempt.
    pub fn start(&mut self, rule: &ReferrerRule) {
        if self.state != ImageLoadState::Unset {
            return;
        }
        self.host_matched = rule.applies(&self.src);
        self.state = ImageLoadState::Loading(Attempt {
            referrer_policy: rule.initial_policy(&self.src),
            cross_origin: false,
        });
        self.error_handler_armed = true;
    }

    pub fn on_load(&mut self) {
        if let ImageLoadState::Loading(attempt) = self.state {
            self.state = ImageLoadState::Loaded(attempt);
        }
    }

    /// Advance after a failed attempt.
    ///
    /// Once the ladder is exhausted the handler is disarmed and later
    /// errors are ignored.
    pub fn on_error(&mut self) {
        if !self.error_handler_armed {
            return;
        }
        let ImageLoadState::Loading(attempt) = self.state else {
            return;
        };

        self.state = if self.host_matched && attempt.referrer_policy != ReferrerPolicy::NoReferrer {
            ImageLoadState::Loading(Attempt {
                referrer_policy: ReferrerPolicy::NoReferrer,
                ..attempt
            })
        } else if !attempt.cross_origin {
            ImageLoadState::Loading(Attempt {
                cross_origin: true,
                ..attempt
            })
        } else {
            self.error_handler_armed = false;
            ImageLoadState::Fallback
        };
    }
}

/// Drive `loader` to a terminal state, probing once per attempt.
///
/// Returns the number of probes made.
pub async fn run_ladder(loader: &mut ImageLoader, probe: &dyn ImageProbe) -> usize {
    let mut probes = 0;
    while let ImageLoadState::Loading(attempt) = loader.state() {
        probes += 1;
        let outcome = probe.probe(loader.src(), attempt).await;
        match outcome {
            Ok(()) => loader.on_load(),
            Err(e) => {
                log::warn!(
                    "Image load failed: {} (referrer={}, crossorigin={}): {}",
                    loader.src(),
                    attempt.referrer_policy.as_str(),
                    attempt.cross_origin,
                    e
                );
                loader.on_error();
            }
        }
    }
    probes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clien() -> ReferrerRule {
        ReferrerRule::new(["clien.net", "edgio.clien.net"])
    }

    #[test]
    fn initial_policy_depends_on_host() {
        let rule = clien();
        assert_eq!(rule.initial_policy("https://edgio.clien.net/a.jpg"), ReferrerPolicy::Origin);
        assert_eq!(rule.initial_policy("https://img.example.com/a.jpg"), ReferrerPolicy::NoReferrer);
        assert!(!ReferrerRule::default().applies("https://clien.net/x"));
    }

    #[test]
    fn matched_host_walks_full_ladder() {
        let mut loader = ImageLoader::new("https://cdn.clien.net/x.png");
        loader.start(&clien());
        assert_eq!(
            loader.state(),
            ImageLoadState::Loading(Attempt { referrer_policy: ReferrerPolicy::Origin, cross_origin: false })
        );

        loader.on_error();
        assert_eq!(
            loader.state(),
            ImageLoadState::Loading(Attempt { referrer_policy: ReferrerPolicy::NoReferrer, cross_origin: false })
        );

        loader.on_error();
        assert_eq!(
            loader.state(),
            ImageLoadState::Loading(Attempt { referrer_policy: ReferrerPolicy::NoReferrer, cross_origin: true })
        );

        loader.on_error();
        assert_eq!(loader.state(), ImageLoadState::Fallback);
        assert!(!loader.error_handler_armed());

        loader.on_error();
        assert_eq!(loader.state(), ImageLoadState::Fallback);
    }

    #[test]
    fn other_hosts_skip_the_referrer_retry() {
        let mut loader = ImageLoader::new("https://img.example.com/x.png");
        loader.start(&clien());
        loader.on_error();
        assert_eq!(
            loader.state(),
            ImageLoadState::Loading(Attempt { referrer_policy: ReferrerPolicy::NoReferrer, cross_origin: true })
        );
        loader.on_error();
        assert_eq!(loader.state(), ImageLoadState::Fallback);
    }

    #[test]
    fn load_keeps_the_successful_attempt() {
        let mut loader = ImageLoader::new("https://clien.net/x.png");
        loader.start(&clien());
        loader.on_error();
        loader.on_load();
        assert_eq!(
            loader.state(),
            ImageLoadState::Loaded(Attempt { referrer_policy: ReferrerPolicy::NoReferrer, cross_origin: false })
        );
        assert!(loader.state().is_terminal());
        loader.on_error();
        assert!(matches!(loader.state(), ImageLoadState::Loaded(_)));
    }

    #[test]
    fn unset_ignores_events() {
        let mut loader = ImageLoader::new("x");
        loader.on_error();
        loader.on_load();
        assert_eq!(loader.state(), ImageLoadState::Unset);
        assert_eq!(loader.state().label(), "unset");
    }
}
