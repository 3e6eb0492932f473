//! Sound assets and their cross-thread reference handles.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Immutable description of a loaded sound.
///
/// Decoding and sample storage live behind the audio backend; the server
/// only needs identity, a nominal duration for end-of-playback accounting,
/// and the streamed-vs-one-shot classification.
#[derive(Debug)]
pub struct SoundAsset {
    name: String,
    duration: Duration,
    streamed: bool,
}

impl SoundAsset {
    /// A fully resident one-shot sound.
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            streamed: false,
        }
    }

    /// A streamed sound: music and other long material serviced in chunks.
    pub fn streamed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            streamed: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_streamed(&self) -> bool {
        self.streamed
    }
}

/// Shared-ownership handle to a [`SoundAsset`] with a designated destructor
/// thread.
///
/// Clones travel to the audio thread inside commands, but every handle must
/// be dropped on the thread that created the first one (the logic thread).
/// The audio thread never drops a `SoundRef`: it moves held refs into the
/// deferred-delete list, which the logic thread drains. Debug builds assert
/// the contract on every drop.
pub struct SoundRef {
    inner: Arc<SoundAsset>,
    #[cfg(debug_assertions)]
    home: std::thread::ThreadId,
}

impl SoundRef {
    /// Wrap an asset. The calling thread becomes the handle's home thread.
    pub fn new(asset: SoundAsset) -> Self {
        Self {
            inner: Arc::new(asset),
            #[cfg(debug_assertions)]
            home: std::thread::current().id(),
        }
    }

    /// Whether two handles refer to the same underlying asset.
    pub fn same_asset(&self, other: &SoundRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to the underlying asset.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Deref for SoundRef {
    type Target = SoundAsset;

    fn deref(&self) -> &SoundAsset {
        &self.inner
    }
}

impl Clone for SoundRef {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            #[cfg(debug_assertions)]
            home: self.home,
        }
    }
}

impl Drop for SoundRef {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            std::thread::current().id(),
            self.home,
            "sound ref for {:?} dropped off its home thread",
            self.inner.name
        );
    }
}

impl std::fmt::Debug for SoundRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundRef")
            .field("name", &self.inner.name)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_accessors() {
        let asset = SoundAsset::new("blip", Duration::from_millis(120));
        assert_eq!(asset.name(), "blip");
        assert_eq!(asset.duration(), Duration::from_millis(120));
        assert!(!asset.is_streamed());

        let music = SoundAsset::streamed("theme", Duration::from_secs(90));
        assert!(music.is_streamed());
    }

    #[test]
    fn test_ref_counting_and_identity() {
        let a = SoundRef::new(SoundAsset::new("blip", Duration::from_millis(50)));
        assert_eq!(a.ref_count(), 1);

        let b = a.clone();
        assert_eq!(a.ref_count(), 2);
        assert!(a.same_asset(&b));

        let other = SoundRef::new(SoundAsset::new("blip", Duration::from_millis(50)));
        assert!(!a.same_asset(&other));

        drop(b);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn test_deref_reaches_asset() {
        let a = SoundRef::new(SoundAsset::new("jump", Duration::from_millis(80)));
        assert_eq!(a.name(), "jump");
        assert_eq!(a.duration(), Duration::from_millis(80));
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_off_thread_drop_asserts() {
        let a = SoundRef::new(SoundAsset::new("boom", Duration::from_millis(10)));
        let clone = a.clone();
        let result = std::thread::spawn(move || drop(clone)).join();
        assert!(
            result.is_err(),
            "off-thread drop should assert in debug builds"
        );
    }
}
