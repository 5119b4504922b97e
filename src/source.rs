//! Backing data for datasets served from a [crate::tree::Node] hierarchy.

use crate::block::Element;
use crate::metadata::DataType;

/// Source of a dataset's elements.
///
/// Reads may be expensive (e.g. procedurally generated data);
/// they are run on the server's worker pool.
pub trait BlockSource: Send + Sync {
    fn data_type(&self) -> DataType;

    /// Big-endian element bytes for the interval starting at `min` with extent `size`,
    /// in F order.
    ///
    /// The interval has already been clamped to the dataset's dimensions.
    fn read(&self, min: &[u64], size: &[u32]) -> crate::Result<Vec<u8>>;

    /// Unstructured attributes of the dataset.
    fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }
}

/// Visit every position of an interval in F order.
pub fn for_each_position(min: &[u64], size: &[u32], mut f: impl FnMut(&[u64])) {
    if size.contains(&0) {
        return;
    }
    let mut position = min.to_vec();
    loop {
        f(&position);
        let mut axis = 0;
        loop {
            if axis == position.len() {
                return;
            }
            position[axis] += 1;
            if position[axis] < min[axis] + size[axis] as u64 {
                break;
            }
            position[axis] = min[axis];
            axis += 1;
        }
    }
}

/// Elements computed from their position.
pub struct FunctionSource<T, F> {
    function: F,
    attributes: serde_json::Map<String, serde_json::Value>,
    _element: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> FunctionSource<T, F>
where
    T: Element,
    F: Fn(&[u64]) -> T + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            attributes: serde_json::Map::new(),
            _element: std::marker::PhantomData,
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

impl<T, F> BlockSource for FunctionSource<T, F>
where
    T: Element,
    F: Fn(&[u64]) -> T + Send + Sync,
{
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn read(&self, min: &[u64], size: &[u32]) -> crate::Result<Vec<u8>> {
        let numel: usize = size.iter().map(|&s| s as usize).product();
        let mut out = Vec::with_capacity(numel * size_of::<T>());
        for_each_position(min, size, |p| (self.function)(p).write_be(&mut out));
        Ok(out)
    }

    fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        self.attributes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_f_order() {
        let mut seen = Vec::new();
        for_each_position(&[10, 20], &[2, 3], |p| seen.push(p.to_vec()));
        assert_eq!(
            seen,
            vec![
                vec![10, 20],
                vec![11, 20],
                vec![10, 21],
                vec![11, 21],
                vec![10, 22],
                vec![11, 22],
            ]
        );
    }

    #[test]
    fn empty_interval_visits_nothing() {
        let mut count = 0;
        for_each_position(&[0, 0], &[3, 0], |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn function_source_writes_big_endian() {
        let source = FunctionSource::new(|p: &[u64]| p.iter().sum::<u64>() as u16);
        assert_eq!(source.data_type(), DataType::Uint16);
        let bytes = source.read(&[255, 0], &[2, 1]).unwrap();
        assert_eq!(bytes, vec![0, 255, 1, 0]);
    }
}
