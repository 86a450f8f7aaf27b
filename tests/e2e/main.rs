//! End-to-end scenarios for expectkit.
