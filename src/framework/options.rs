use std::fmt;
use std::ops::BitOr;

/// Flags changing how [`separable`](super::separable) and
/// [`one_dimensional_line_filter`](super::one_dimensional_line_filter) handle
/// lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeparableOption {
    /// Process all lines on the calling thread.
    NoMultiThreading,
    /// Treat the tensor elements as an extra (unprocessed) spatial dimension.
    AsScalarImage,
    /// Expand diagonal, symmetric and triangular tensors to full matrices.
    ExpandTensorInBuffer,
    /// Give the output buffer the same border as the input buffer.
    UseOutputBorder,
    /// Keep the sizes of a forged output image instead of matching the input.
    DontResizeOutput,
    UseInputBuffer,
    UseOutputBuffer,
    /// The filter can read and write the same memory.
    CanWorkInPlace,
    /// Write back only the real part of a complex output buffer.
    UseRealComponentOfOutput,
}

impl SeparableOption {
    pub const ALL: [SeparableOption; 9] = [
        SeparableOption::NoMultiThreading,
        SeparableOption::AsScalarImage,
        SeparableOption::ExpandTensorInBuffer,
        SeparableOption::UseOutputBorder,
        SeparableOption::DontResizeOutput,
        SeparableOption::UseInputBuffer,
        SeparableOption::UseOutputBuffer,
        SeparableOption::CanWorkInPlace,
        SeparableOption::UseRealComponentOfOutput,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of [`SeparableOption`] flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SeparableOptions {
    bits: u16,
}

impl SeparableOptions {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn with(mut self, option: SeparableOption) -> Self {
        self.bits |= option.bit();
        self
    }

    pub const fn without(mut self, option: SeparableOption) -> Self {
        self.bits &= !option.bit();
        self
    }

    pub const fn contains(self, option: SeparableOption) -> bool {
        self.bits & option.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = SeparableOption> {
        SeparableOption::ALL
            .into_iter()
            .filter(move |&option| self.contains(option))
    }
}

impl From<SeparableOption> for SeparableOptions {
    fn from(option: SeparableOption) -> Self {
        SeparableOptions::new().with(option)
    }
}

impl BitOr for SeparableOption {
    type Output = SeparableOptions;

    fn bitor(self, rhs: SeparableOption) -> SeparableOptions {
        SeparableOptions::from(self).with(rhs)
    }
}

impl BitOr<SeparableOption> for SeparableOptions {
    type Output = SeparableOptions;

    fn bitor(self, rhs: SeparableOption) -> SeparableOptions {
        self.with(rhs)
    }
}

impl fmt::Debug for SeparableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_and_clears_flags() {
        let opts = SeparableOptions::new()
            .with(SeparableOption::AsScalarImage)
            .with(SeparableOption::UseOutputBorder);
        assert!(opts.contains(SeparableOption::AsScalarImage));
        assert!(!opts.contains(SeparableOption::DontResizeOutput));
        let opts = opts.without(SeparableOption::AsScalarImage);
        assert_eq!(opts.iter().collect::<Vec<_>>(), vec![SeparableOption::UseOutputBorder]);
        assert_eq!(
            SeparableOption::CanWorkInPlace | SeparableOption::NoMultiThreading,
            SeparableOptions::new()
                .with(SeparableOption::NoMultiThreading)
                .with(SeparableOption::CanWorkInPlace)
        );
        assert!(SeparableOptions::default().is_empty());
    }
}
