#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug", derive(Debug))]
#[repr(u8)]
pub enum Phase {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
}

impl Phase {
    pub fn is_ready(self) -> bool {
        matches!(self, Phase::Ready)
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Phase::Uninitialized,
            1 => Phase::Initializing,
            _ => Phase::Ready,
        }
    }
}
