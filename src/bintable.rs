//! Binary table data unit access
//!
//! Single columns are transferred with one engine call. Several columns, of
//! possibly different value types, are transferred chunk by chunk: the engine
//! is asked once for its optimal number of rows, and each chunk of rows is
//! transferred column after column, in the order of the caller.
//!
//! ```rust,ignore
//! let mut ids = VecColumn::<i32>::with_rows(ColumnInfo::new("ID", "", 1)?, 0)?;
//! let mut names = VecColumn::<String>::with_rows(ColumnInfo::new("NAME", "", 16)?, 0)?;
//! bintable::read_columns(&engine, &mut [&mut ids, &mut names])?;
//! ```
//!
//! Writes are not transactional: if a chunk fails, the previous chunks stay
//! written.

use crate::column::{ColumnInfo, ColumnValue, DynColumn, DynColumnMut, VecColumn};
use crate::engine::{ColumnDescriptor, StorageEngine};
use crate::error::{FitsError, Result};
use crate::region::Segment;
use tracing::{debug, trace, warn};

/// 0-based index of the column of given name
pub fn column_index(engine: &dyn StorageEngine, name: &str) -> Result<usize> {
    engine.column_index(name)
}

/// Name, unit and repeat count of a column
pub fn read_column_info(engine: &dyn StorageEngine, index: usize) -> Result<ColumnInfo> {
    let descriptor = engine.read_column_info(index)?;
    let (_, repeat_count) = descriptor.format()?;
    ColumnInfo::new(descriptor.name, descriptor.unit, repeat_count)
}

/// Read a whole column by name
pub fn read_column<T: ColumnValue>(
    engine: &dyn StorageEngine,
    name: &str,
) -> Result<VecColumn<T>> {
    read_column_at(engine, column_index(engine, name)?)
}

/// Read a whole column by index
pub fn read_column_at<T: ColumnValue>(
    engine: &dyn StorageEngine,
    index: usize,
) -> Result<VecColumn<T>> {
    let rows = Segment::from_size(0, engine.row_count()?);
    read_segment_at(engine, index, rows)
}

/// Read some rows of a column by name
pub fn read_column_segment<T: ColumnValue>(
    engine: &dyn StorageEngine,
    name: &str,
    rows: Segment,
) -> Result<VecColumn<T>> {
    read_segment_at(engine, column_index(engine, name)?, rows)
}

fn read_segment_at<T: ColumnValue>(
    engine: &dyn StorageEngine,
    index: usize,
    rows: Segment,
) -> Result<VecColumn<T>> {
    let descriptor = engine.read_column_info(index)?;
    debug!(
        column = %descriptor.name,
        tform = %descriptor.tform,
        first = rows.first,
        count = rows.count,
        "Reading column"
    );
    let info = ColumnInfo::new(descriptor.name.clone(), "", 1)?;
    let mut column = VecColumn::with_rows(info, 0)?;
    column.prepare(&descriptor, rows.count)?;
    column.read_rows(engine, index, Segment::from_size(0, rows.count), rows.first)?;
    Ok(column)
}

/// Write a column to the table column of the same name, from the first row
pub fn write_column(engine: &mut dyn StorageEngine, column: &dyn DynColumn) -> Result<()> {
    write_column_segment(engine, column, 0)
}

/// Write a column to the table column of the same name, from `first_row`
pub fn write_column_segment(
    engine: &mut dyn StorageEngine,
    column: &dyn DynColumn,
    first_row: usize,
) -> Result<()> {
    let index = column_index(engine, column.name())?;
    debug!(column = column.name(), first_row, count = column.row_count(), "Writing column");
    column.write_rows(
        engine,
        index,
        Segment::from_size(0, column.row_count()),
        first_row,
    )
}

/// Number of rows per chunk, which must not be 0
fn chunk_size(engine: &dyn StorageEngine) -> Result<usize> {
    match engine.optimal_row_chunk_size()? {
        0 => Err(FitsError::Configuration(
            "Engine reports an optimal row chunk size of 0".into(),
        )),
        size => Ok(size),
    }
}

/// Visit table rows chunk by chunk, then column by column within a chunk
fn for_each_chunk<F>(rows: Segment, chunk_size: usize, column_count: usize, mut f: F) -> Result<()>
where
    F: FnMut(usize, Segment) -> Result<()>,
{
    let mut first = rows.first;
    while first < rows.end() {
        let chunk = Segment::from_size(first, chunk_size.min(rows.end() - first));
        trace!(first = chunk.first, count = chunk.count, "Transferring chunk");
        for column in 0..column_count {
            f(column, chunk)?;
        }
        first = chunk.end();
    }
    Ok(())
}

/// Read whole columns, located by name, in chunks of rows.
///
/// Each column takes the unit and repeat count of the table column, and is
/// resized to the number of rows.
pub fn read_columns(
    engine: &dyn StorageEngine,
    columns: &mut [&mut dyn DynColumnMut],
) -> Result<()> {
    let rows = Segment::from_size(0, engine.row_count()?);
    read_columns_segment(engine, rows, columns)
}

/// Read some rows of columns, located by name, in chunks of rows
pub fn read_columns_segment(
    engine: &dyn StorageEngine,
    rows: Segment,
    columns: &mut [&mut dyn DynColumnMut],
) -> Result<()> {
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns.iter_mut() {
        let index = column_index(engine, column.name())?;
        column.prepare(&engine.read_column_info(index)?, rows.count)?;
        indices.push(index);
    }
    let chunk_size = chunk_size(engine)?;
    debug!(
        columns = columns.len(),
        first = rows.first,
        count = rows.count,
        chunk_size,
        "Reading columns"
    );
    for_each_chunk(rows, chunk_size, columns.len(), |i, chunk| {
        let local = Segment::from_size(chunk.first - rows.first, chunk.count);
        columns[i].read_rows(engine, indices[i], local, rows.first)
    })
}

/// Write columns to the table columns of the same names, in chunks of rows
pub fn write_columns(engine: &mut dyn StorageEngine, columns: &[&dyn DynColumn]) -> Result<()> {
    write_columns_at(engine, columns, 0)
}

/// Write columns from table row `first_row`, in chunks of rows.
///
/// Columns of different lengths are each written on their own rows only.
pub fn write_columns_at(
    engine: &mut dyn StorageEngine,
    columns: &[&dyn DynColumn],
    first_row: usize,
) -> Result<()> {
    let indices = columns
        .iter()
        .map(|column| column_index(engine, column.name()))
        .collect::<Result<Vec<_>>>()?;
    write_indexed_columns(engine, &indices, columns, first_row)
}

fn write_indexed_columns(
    engine: &mut dyn StorageEngine,
    indices: &[usize],
    columns: &[&dyn DynColumn],
    first_row: usize,
) -> Result<()> {
    let chunk_size = chunk_size(engine)?;
    let row_count = columns.iter().map(|column| column.row_count()).max().unwrap_or(0);
    if columns.iter().any(|column| column.row_count() != row_count) {
        warn!(row_count, "Writing columns of different lengths");
    }
    debug!(columns = columns.len(), first_row, row_count, chunk_size, "Writing columns");
    let rows = Segment::from_size(first_row, row_count);
    for_each_chunk(rows, chunk_size, columns.len(), |i, chunk| {
        let first = chunk.first - first_row;
        let end = chunk.end().min(first_row + columns[i].row_count()) - first_row;
        if first >= end {
            return Ok(());
        }
        let local = Segment::from_size(first, end - first);
        columns[i].write_rows(&mut *engine, indices[i], local, first_row)
    })
}

/// Insert a column before the column at `position` (0-based) and write its values
pub fn insert_column(
    engine: &mut dyn StorageEngine,
    position: usize,
    column: &dyn DynColumn,
) -> Result<()> {
    insert_columns(engine, position, &[column])
}

/// Insert columns before the column at `position` (0-based) and write their values
pub fn insert_columns(
    engine: &mut dyn StorageEngine,
    position: usize,
    columns: &[&dyn DynColumn],
) -> Result<()> {
    let descriptors: Vec<ColumnDescriptor> =
        columns.iter().map(|column| column.descriptor()).collect();
    debug!(position, count = columns.len(), "Inserting columns");
    engine.insert_columns(position, &descriptors)?;
    let indices: Vec<usize> = (position..position + columns.len()).collect();
    write_indexed_columns(engine, &indices, columns, 0)
}

/// Add a column after the last one and write its values
pub fn append_column(engine: &mut dyn StorageEngine, column: &dyn DynColumn) -> Result<()> {
    append_columns(engine, &[column])
}

/// Add columns after the last one and write their values
pub fn append_columns(engine: &mut dyn StorageEngine, columns: &[&dyn DynColumn]) -> Result<()> {
    let position = engine.column_count()?;
    insert_columns(engine, position, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::status;
    use crate::memory::{EngineCall, MemoryEngine};

    fn ids(rows: i32) -> VecColumn<i32> {
        VecColumn::new(ColumnInfo::new("ID", "", 1).unwrap(), (0..rows).collect()).unwrap()
    }

    #[test]
    fn test_append_and_read_column() {
        let mut engine = MemoryEngine::new();
        let column = ids(5);
        append_column(&mut engine, &column).unwrap();
        assert_eq!(column_index(&engine, "ID").unwrap(), 0);
        assert_eq!(read_column_info(&engine, 0).unwrap(), *column.info());

        let back = read_column::<i32>(&engine, "ID").unwrap();
        assert_eq!(back, column);

        let segment = read_column_segment::<i32>(&engine, "ID", Segment::from_size(1, 3)).unwrap();
        assert_eq!(segment.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_missing_column() {
        let engine = MemoryEngine::new();
        let err = read_column::<f32>(&engine, "NOPE").unwrap_err();
        assert_eq!(err.status(), Some(status::COL_NOT_FOUND));
    }

    #[test]
    fn test_write_column_segment_grows_table() {
        let mut engine = MemoryEngine::new();
        append_column(&mut engine, &ids(2)).unwrap();
        write_column_segment(&mut engine, &ids(3), 4).unwrap();
        let back = read_column::<i32>(&engine, "ID").unwrap();
        assert_eq!(back.data(), &[0, 1, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_insert_columns_position() {
        let mut engine = MemoryEngine::new();
        append_column(&mut engine, &ids(3)).unwrap();
        let info = ColumnInfo::new("FLUX", "Jy", 2).unwrap();
        let flux = VecColumn::new(info, vec![0.5f64; 6]).unwrap();
        insert_column(&mut engine, 0, &flux).unwrap();
        assert_eq!(column_index(&engine, "FLUX").unwrap(), 0);
        assert_eq!(column_index(&engine, "ID").unwrap(), 1);
        assert_eq!(read_column_info(&engine, 0).unwrap().unit, "Jy");
    }

    #[test]
    fn test_chunks_and_call_order() {
        let mut engine = MemoryEngine::new();
        engine.set_row_chunk_size(2);
        let names = VecColumn::new(
            ColumnInfo::new("NAME", "", 4).unwrap(),
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .unwrap();
        append_columns(&mut engine, &[&ids(5), &names]).unwrap();

        engine.clear_calls();
        let mut id = VecColumn::<i32>::with_rows(ColumnInfo::new("ID", "", 1).unwrap(), 0).unwrap();
        let name_info = ColumnInfo::new("NAME", "", 1).unwrap();
        let mut name = VecColumn::<String>::with_rows(name_info, 0).unwrap();
        read_columns(&engine, &mut [&mut id, &mut name]).unwrap();
        assert_eq!(id, ids(5));
        assert_eq!(name, names);

        let transfers: Vec<(usize, Segment)> = engine
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::ReadColumnCells { index, rows } => Some((index, rows)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transfers,
            vec![
                (0, Segment::from_size(0, 2)),
                (1, Segment::from_size(0, 2)),
                (0, Segment::from_size(2, 2)),
                (1, Segment::from_size(2, 2)),
                (0, Segment::from_size(4, 1)),
                (1, Segment::from_size(4, 1)),
            ]
        );
    }

    #[test]
    fn test_zero_chunk_size_aborts() {
        let mut engine = MemoryEngine::new();
        append_column(&mut engine, &ids(3)).unwrap();
        engine.set_row_chunk_size(0);
        engine.clear_calls();

        let mut id = VecColumn::<i32>::with_rows(ColumnInfo::new("ID", "", 1).unwrap(), 0).unwrap();
        assert!(matches!(
            read_columns(&engine, &mut [&mut id]),
            Err(FitsError::Configuration(_))
        ));
        assert!(matches!(
            write_columns(&mut engine, &[&ids(3)]),
            Err(FitsError::Configuration(_))
        ));
        assert!(!engine.calls().iter().any(EngineCall::is_column_transfer));
    }

    #[test]
    fn test_unequal_lengths() {
        let mut engine = MemoryEngine::new();
        engine.set_row_chunk_size(3);
        let info = ColumnInfo::new("SHORT", "", 1).unwrap();
        let short = VecColumn::new(info, vec![7i16; 2]).unwrap();
        append_columns(&mut engine, &[&ids(5), &short]).unwrap();
        assert_eq!(engine.row_count().unwrap(), 5);
        let back = read_column::<i16>(&engine, "SHORT").unwrap();
        assert_eq!(back.data(), &[7, 7, 0, 0, 0]);
    }
}
