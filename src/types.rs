//! Type-safe handles used across the analysis.
//!
//! Program entities (values, blocks, statements, memory objects) and graph
//! entities (variable nodes, operation nodes) are all addressed by small
//! integer newtypes. Keeping them distinct prevents mixing up, say, the id of
//! a program value with the arena index of the node that tracks it.

use std::fmt;

/// Number of bits of an integer quantity.
pub type BitWidth = u32;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            pub fn new(index: usize) -> Self {
                assert!(index <= u32::MAX as usize, concat!(stringify!($name), " index overflow"));
                $name(index as u32)
            }

            /// Returns the raw index as a `usize`.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<$name> for usize {
            fn from(id: $name) -> Self {
                id.index()
            }
        }
    };
}

index_type!(
    /// A program value (SSA name or constant) of the analysed program.
    ValueId,
    "v"
);

index_type!(
    /// A basic block of the analysed program.
    BlockId,
    "bb"
);

index_type!(
    /// A statement of the analysed program.
    StmtId,
    "s"
);

index_type!(
    /// A memory object that loads read from.
    MemoryId,
    "m"
);

index_type!(
    /// Index of a [`VarNode`][crate::var_node::VarNode] inside its container.
    VarId,
    "var"
);

index_type!(
    /// Index of an [`OpNode`][crate::op_node::OpNode] inside its container.
    OpId,
    "op"
);
