//! Declaration modifier flags.
//!
//! The bit layout follows the class-file access flags the semantic analyzer
//! has always used, plus the analyzer-private `UNRESOLVED` and
//! `DEFAULT_ABSTRACT` bits which never reach the public facades.

use bitflags::bitflags;

bitflags! {
    /// Modifier bits carried by raw bindings and declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
    pub struct Modifiers: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        /// Class-file "super" bit; ignored when comparing types.
        const SUPER = 0x0020;
        const ABSTRACT = 0x0400;
        /// Abstract method inherited without an explicit declaration.
        const DEFAULT_ABSTRACT = 0x0008_0000;
        const DEPRECATED = 0x0010_0000;
        /// Binding whose signature or hierarchy is not resolved yet.
        const UNRESOLVED = 0x0200_0000;
    }
}

impl Modifiers {
    /// Bits a facade may expose through `modifiers()`.
    pub const VALID: Modifiers = Modifiers::PUBLIC
        .union(Modifiers::PRIVATE)
        .union(Modifiers::PROTECTED)
        .union(Modifiers::STATIC)
        .union(Modifiers::FINAL)
        .union(Modifiers::ABSTRACT);

    /// Bits that come from the declaration itself; used when comparing
    /// fields and variables.
    pub const DECLARED: Modifiers = Modifiers::VALID;

    /// Map a source keyword to its modifier bit.
    pub fn from_keyword(keyword: &str) -> Option<Modifiers> {
        Some(match keyword {
            "public" => Modifiers::PUBLIC,
            "private" => Modifiers::PRIVATE,
            "protected" => Modifiers::PROTECTED,
            "static" => Modifiers::STATIC,
            "final" | "const" => Modifiers::FINAL,
            "abstract" => Modifiers::ABSTRACT,
            "deprecated" => Modifiers::DEPRECATED,
            _ => return None,
        })
    }

    /// Modifiers without the analyzer-private bits.
    #[inline]
    pub fn visible(self) -> Modifiers {
        self & Modifiers::VALID
    }

    #[inline]
    pub fn is_unresolved(self) -> bool {
        self.contains(Modifiers::UNRESOLVED)
    }
}
