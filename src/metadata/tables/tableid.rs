use strum::{EnumCount, EnumIter, FromRepr};

/// Identifiers for the metadata tables defined in ECMA-335 II.22.
///
/// The numeric values are the table numbers stored in the high byte of a
/// [`crate::metadata::token::Token`].
///
/// ## Table Categories
///
/// ### Core Type System
/// - **`Module`**, **`TypeDef`**, **`TypeRef`**, **`Field`**, **`MethodDef`**, **`Param`**
///
/// ### Member References
/// - **`MemberRef`**: References to members of other types or modules
/// - **`MethodSpec`**: Generic method instantiations
/// - **`TypeSpec`**: Constructed types (generic instances, arrays, pointers)
///
/// ### Scopes
/// - **`AssemblyRef`**, **`ModuleRef`**, **`Assembly`**, **`File`**, **`ExportedType`**
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, FromRepr, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    Field = 0x04,
    MethodDef = 0x06,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    Event = 0x14,
    PropertyMap = 0x15,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

/// Number of row count slots, indexed by table number.
pub(crate) const TABLE_SLOTS: usize = TableId::GenericParamConstraint as usize + 1;
