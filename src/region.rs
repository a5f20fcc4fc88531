use std::ops::{Index, Range};

/// Represents an area within a template buffer.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Region {
    /// The beginning of the range, inclusive.
    pub begin: usize,
    /// The ending of the range, exclusive.
    pub end: usize,
}

impl Region {
    /// Create a new Region from the given range.
    pub fn new(position: Range<usize>) -> Self {
        Self {
            begin: position.start,
            end: position.end,
        }
    }

    /// Return the number of bytes covered by the [`Region`].
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Return true if the [`Region`] covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Return a copy of `source` with the [`Region`] replaced by `with`.
    pub fn splice(&self, source: &str, with: &str) -> String {
        let mut buffer = String::with_capacity(source.len() - self.len() + with.len());
        buffer.push_str(&source[..self.begin]);
        buffer.push_str(with);
        buffer.push_str(&source[self.end..]);

        buffer
    }
}

impl Index<Region> for str {
    type Output = str;

    fn index(&self, region: Region) -> &Self::Output {
        let Region { begin, end } = region;

        &self[begin..end]
    }
}

impl From<Range<usize>> for Region {
    fn from(value: Range<usize>) -> Self {
        Self::new(value)
    }
}

impl From<Region> for Range<usize> {
    fn from(value: Region) -> Self {
        value.begin..value.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        let source = "Hello, %%Partial=Nav%%!";

        assert_eq!(&source[Region::new(7..22)], "%%Partial=Nav%%");
    }

    #[test]
    fn test_splice() {
        let source = "a %%Head%% b";
        let region = Region::new(2..10);

        assert_eq!(region.splice(source, "<title/>"), "a <title/> b");
        assert_eq!(region.splice(source, ""), "a  b");
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_index() {
        let source = "Hello";
        let _ = &source[Region::new(2..15)];
    }
}
