// Pooled lookups over row-wise quantized embedding tables
pub mod bag;
pub mod error;
pub mod table;

pub use bag::{
    embedding_bag_lookup, embedding_bag_table, single_embedding_lookup, BagOptions, BagOutput, ExecParams,
    OffsetConvention, PruningMap, PRUNED,
};
pub use error::{EmbagError, Result};
pub use table::{BitWidth, ByteMatrix, PackedEmbedding, PackedTable};
