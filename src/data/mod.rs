/// Data layer: core types, loading, and column typing.
///
/// Architecture:
/// ```text
///   uploaded .csv bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  utf-8 → utf-8-sig → cp932, parse → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RawTable  │  ordered columns, untyped cells
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  time + value coercion, drop missing, sort → CleanedTable
///   └──────────┘
/// ```

pub mod clean;
pub mod loader;
pub mod model;
