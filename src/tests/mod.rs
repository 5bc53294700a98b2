//! Cross-module integration tests exercising the full cycle pipeline.
