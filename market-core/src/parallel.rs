//! Parallel or sequential mapping, chosen by the `parallel` feature.
//!
//! The `cfg` switch lives here so call sites stay the same either way.
//! `force_sequential` turns parallelism off at runtime for profiling and for
//! tests that compare the two paths.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map over a slice. Output order matches input order in both modes.
#[inline]
pub fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            slice.iter().map(f).collect()
        } else {
            slice.par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        slice.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_both_ways() {
        let xs: Vec<u32> = (0..1000).collect();
        let par = map_slice(&xs, |x| x * 2, false);
        let seq = map_slice(&xs, |x| x * 2, true);
        assert_eq!(par, seq);
        assert_eq!(par[999], 1998);
    }
}
