/// A source of uniformly distributed indices used to pick key characters.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. Implementations must be safe to share across
/// workers; a fill hands each worker its own clone.
///
/// # Example
/// ```
/// use kgs::{KeyGenerator, RandSource};
///
/// #[derive(Clone)]
/// struct FirstChar;
/// impl RandSource for FirstChar {
///     fn next_index(&self, _upper: usize) -> usize {
///         0
///     }
/// }
///
/// let generator = KeyGenerator::new(4, FirstChar).unwrap();
/// assert_eq!(generator.generate(), "aaaa");
/// ```
pub trait RandSource {
    /// Returns an index in `0..upper`, drawn uniformly.
    ///
    /// `upper` is always greater than zero.
    fn next_index(&self, upper: usize) -> usize;
}
