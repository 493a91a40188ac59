//! Platform capability probe

/// Answers platform questions that change the fusion profile
pub trait PlatformProbe {
    /// True when the attitude frame follows the Android convention
    fn is_android_like(&self) -> bool;
}

/// Probe resolved from the build target
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProbe;

impl PlatformProbe for NativeProbe {
    fn is_android_like(&self) -> bool {
        cfg!(target_os = "android")
    }
}

/// Probe with a configured answer
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl PlatformProbe for FixedProbe {
    fn is_android_like(&self) -> bool {
        self.0
    }
}
