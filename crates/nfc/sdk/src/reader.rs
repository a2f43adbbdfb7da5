//! Reader inventory

/// A card reader known to the resource manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reader {
    /// 1-based id in discovery order
    id: usize,

    /// Name of the reader as reported by the resource manager
    name: String,

    /// Whether the reader is monitored by the event loop
    enabled: bool,
}

impl Reader {
    /// Create a new, not yet enabled, reader
    pub const fn new(id: usize, name: String) -> Self {
        Self {
            id,
            name,
            enabled: false,
        }
    }

    /// Get the reader id
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Get the reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the reader is monitored
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mark the reader for monitoring
    pub const fn enable(&mut self) {
        self.enabled = true;
    }

    /// Exclude the reader from monitoring
    pub const fn disable(&mut self) {
        self.enabled = false;
    }

    /// Builder-style variant of [`Reader::enable`]
    pub const fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }
}

/// Build the inventory from reader names, assigning ids in discovery order
pub(crate) fn inventory<I>(names: I) -> Vec<Reader>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Reader::new(i + 1, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_ids() {
        let readers = inventory(["R0".to_string(), "R1".to_string()]);
        assert_eq!(readers.len(), 2);
        assert_eq!(readers[0].id(), 1);
        assert_eq!(readers[0].name(), "R0");
        assert_eq!(readers[1].id(), 2);
        assert!(readers.iter().all(|r| !r.is_enabled()));
    }

    #[test]
    fn test_enable() {
        let mut reader = Reader::new(1, "R0".into());
        reader.enable();
        assert!(reader.is_enabled());
        reader.disable();
        assert!(!reader.is_enabled());
        assert!(reader.enabled().is_enabled());
    }
}
