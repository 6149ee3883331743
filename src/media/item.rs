//! Media item representation.

/// Type of media content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Image,
}

impl MediaType {
    /// File extension used for downloaded items of this type.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Video => "mp4",
            MediaType::Image => "jpg",
        }
    }

    /// Human-readable label for statistics.
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "gallery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(MediaType::Video.extension(), "mp4");
        assert_eq!(MediaType::Image.extension(), "jpg");
    }
}
