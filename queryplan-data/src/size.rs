use std::mem::{size_of, size_of_val};

use crate::Value;

/// Estimates of the in-memory footprint of a value, used to enforce byte limits.
pub trait SizeOf {
    /// Size of the value including everything it owns on the heap.
    fn deep_size_of(&self) -> u64;
    /// Size of the value itself, not counting heap data.
    fn size_of(&self) -> u64;
}

impl SizeOf for Value {
    fn deep_size_of(&self) -> u64 {
        let inner = match self {
            Value::Text(t) => t.capacity() as u64,
            Value::Tuple(vs) | Value::Array(vs) => vs.deep_size_of(),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| k.deep_size_of() + v.deep_size_of())
                .sum::<u64>(),
            _ => 0,
        };

        self.size_of() + inner
    }

    fn size_of(&self) -> u64 {
        // doesn't include data if stored externally
        size_of::<Value>() as u64
    }
}

impl SizeOf for Vec<Value> {
    fn deep_size_of(&self) -> u64 {
        let mut size =
            size_of_val(self) as u64 + self.iter().fold(0u64, |acc, d| acc + d.deep_size_of());
        // To account for vector overallocation
        size += (self.capacity() - self.len()) as u64 * size_of::<Value>() as u64;
        size
    }

    fn size_of(&self) -> u64 {
        size_of_val(self) as u64 + size_of::<Value>() as u64 * self.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_counts_heap_data() {
        let short = Value::from("a");
        let long = Value::from("a much longer piece of text");
        assert!(long.deep_size_of() > short.deep_size_of());
        assert_eq!(short.size_of(), long.size_of());
    }

    #[test]
    fn row_is_at_least_sum_of_values() {
        let row: Vec<Value> = vec![1.into(), "abc".into()];
        let values: u64 = row.iter().map(SizeOf::deep_size_of).sum();
        assert!(row.deep_size_of() >= values);
    }
}
