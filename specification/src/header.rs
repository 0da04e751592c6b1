use super::SchemaEntry;

///
/// Canonical id of `EBMLMaxIDLength`.
///
pub const MAX_ID_LENGTH_ID: &str = "42f2";

///
/// Canonical id of `EBMLMaxSizeLength`.
///
pub const MAX_SIZE_LENGTH_ID: &str = "42f3";

///
/// Elements of the EBML header plus the global `Void` and `CRC-32` elements.
///
/// These are present in every EBML document regardless of document type.
///
pub fn entries() -> Vec<SchemaEntry> {
    vec![
        SchemaEntry::path(0x1a45dfa3u64, "EBML", "master", r"1*1(\EBML)"),
        SchemaEntry::path(0x4286u64, "EBMLVersion", "uinteger", r"1*1(\EBML\EBMLVersion)"),
        SchemaEntry::path(0x42f7u64, "EBMLReadVersion", "uinteger", r"1*1(\EBML\EBMLReadVersion)"),
        SchemaEntry::path(0x42f2u64, "EBMLMaxIDLength", "uinteger", r"1*1(\EBML\EBMLMaxIDLength)"),
        SchemaEntry::path(0x42f3u64, "EBMLMaxSizeLength", "uinteger", r"1*1(\EBML\EBMLMaxSizeLength)"),
        SchemaEntry::path(0x4282u64, "DocType", "string", r"1*1(\EBML\DocType)"),
        SchemaEntry::path(0x4287u64, "DocTypeVersion", "uinteger", r"1*1(\EBML\DocTypeVersion)"),
        SchemaEntry::path(0x4285u64, "DocTypeReadVersion", "uinteger", r"1*1(\EBML\DocTypeReadVersion)"),
        SchemaEntry::path(0x4281u64, "DocTypeExtension", "master", r"0*(\EBML\DocTypeExtension)"),
        SchemaEntry::path(0x4283u64, "DocTypeExtensionName", "string", r"1*1(\EBML\DocTypeExtension\DocTypeExtensionName)"),
        SchemaEntry::path(0x4284u64, "DocTypeExtensionVersion", "uinteger", r"1*1(\EBML\DocTypeExtension\DocTypeExtensionVersion)"),
        SchemaEntry::path(0xbfu64, "CRC-32", "binary", r"0*1((1*\)\CRC-32)"),
        SchemaEntry::path(0xecu64, "Void", "binary", r"0*((1*\)\Void)"),
    ]
}
