use std::marker::PhantomData;

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{ColumnKind, TableId, TableInfo, TableLayout},
        token::Token,
    },
    Error, Result,
};

/// A row type of a metadata table.
///
/// Rows read and write themselves through a [`TableLayout`] derived from [`Self::COLUMNS`], the
/// logical column list in storage order.
pub trait RowDefinition: Sized {
    /// The table this row belongs to
    const TABLE: TableId;

    /// Logical columns in storage order
    const COLUMNS: &'static [ColumnKind];

    /// Derive the physical layout of this row under `info`.
    #[must_use]
    fn layout(info: &TableInfo) -> TableLayout {
        info.layout(Self::TABLE, Self::COLUMNS)
    }

    /// Size of one row in bytes under `info`.
    #[must_use]
    fn row_size(info: &TableInfo) -> u32 {
        Self::layout(info).row_size()
    }

    /// Read one row.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] or [`crate::Error::InvalidCodedIndexTarget`].
    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self>;

    /// Write one row.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCodedIndexTarget`] or [`crate::Error::ValueOutOfRange`]
    /// if a column value doesn't fit the layout.
    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()>;
}

/// A view over the rows of one table stored in a byte slice.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    layout: TableLayout,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowDefinition> MetadataTable<'a, T> {
    /// Create a table over `data` holding `row_count` rows laid out per `info`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if `data` is too short for `row_count` rows.
    pub fn new(data: &'a [u8], row_count: u32, info: &TableInfo) -> Result<Self> {
        let layout = T::layout(info);
        let needed = u64::from(row_count) * u64::from(layout.row_size());
        if needed > data.len() as u64 {
            return Err(Error::TruncatedData);
        }

        Ok(MetadataTable {
            data,
            row_count,
            layout,
            _phantom: PhantomData,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Size of one row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.layout.row_size()
    }

    /// Read the row with the 1-based `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotFound`] if `rid` is outside the table.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(Error::TokenNotFound(Token::from_parts(T::TABLE, rid)));
        }

        let mut parser = Parser::new(self.data);
        parser.seek((rid as usize - 1) * self.layout.row_size() as usize)?;
        T::read_row(&mut parser, &self.layout)
    }

    /// Iterate over all rows in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        (1..=self.row_count).map(move |rid| self.get(rid))
    }
}

/// Serialize `rows` as a table laid out per `info`.
///
/// # Errors
/// Propagates the first error of [`RowDefinition::write_row`].
pub fn write_table<T: RowDefinition>(rows: &[T], info: &TableInfo) -> Result<Vec<u8>> {
    let layout = T::layout(info);
    let mut writer = Writer::with_capacity(rows.len() * layout.row_size() as usize);
    for row in rows {
        row.write_row(&mut writer, &layout)?;
    }
    Ok(writer.into_inner())
}
