//! Obtaining the bytes of a file named by a path.

cfg_if::cfg_if! {
    if #[cfg(unix)]{
        pub(crate) mod unix;
        pub(crate) use unix::*;
    }else {
        pub(crate) mod bare;
        pub(crate) use bare::*;
    }
}
