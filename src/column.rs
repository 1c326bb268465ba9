//! Table columns
//!
//! A column couples a [`ColumnInfo`] (name, unit, cell shape) with a buffer of
//! values stored row after row. What one row occupies depends on the value
//! type, see [`ColumnValue`]:
//!
//! - numbers: `repeat_count` values per row;
//! - `String`: one string per row, at most `repeat_count` bytes long;
//! - `Vec<T>`: one vector of exactly `repeat_count` numbers per row.
//!
//! [`DynColumn`] and [`DynColumnMut`] erase the value type so that columns of
//! different types can be transferred together.

use crate::engine::{status, ColumnDescriptor, StorageEngine};
use crate::error::{FitsError, Result};
use crate::position::{Axes, Position};
use crate::raster::{PtrRaster, PtrRasterMut, Raster};
use crate::region::Segment;
use crate::types::{Cells, CellsMut, Scalar, TypeCode};
use crate::utils::{resolve_backward, to_i64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Name, unit and cell shape of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo<A: Axes = [i64; 1]> {
    pub name: String,
    pub unit: String,
    /// Shape of one cell; its size is the repeat count
    pub shape: Position<A>,
}

impl ColumnInfo<[i64; 1]> {
    /// Info of a column with `repeat_count` values per cell
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        repeat_count: usize,
    ) -> Result<Self> {
        Self::with_shape(name, unit, Position::from([to_i64(repeat_count)?]))
    }
}

impl<A: Axes> ColumnInfo<A> {
    pub fn with_shape(
        name: impl Into<String>,
        unit: impl Into<String>,
        shape: Position<A>,
    ) -> Result<Self> {
        shape.shape_size()?;
        Ok(Self {
            name: name.into(),
            unit: unit.into(),
            shape,
        })
    }

    /// Number of values per cell
    pub fn repeat_count(&self) -> usize {
        self.shape.shape_size().unwrap_or(0)
    }

    /// Engine-side description for values of type `T`
    pub fn descriptor<T: ColumnValue>(&self) -> ColumnDescriptor {
        ColumnDescriptor::new(
            self.name.clone(),
            T::type_code().tform(self.repeat_count()),
            self.unit.clone(),
        )
    }
}

/// Value type of a column, with its transfer strategy
pub trait ColumnValue: Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Type of the values transferred with the engine
    fn type_code() -> TypeCode;

    /// Buffer elements per row
    fn values_per_row(repeat_count: usize) -> usize;

    /// Check buffer elements against the repeat count
    fn validate(values: &[Self], repeat_count: usize) -> Result<()>;

    /// Read `rows` of column `index` into `out`
    fn read_cells(
        engine: &dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        out: &mut [Self],
    ) -> Result<()>;

    /// Write `values` to `rows` of column `index`
    fn write_cells(
        engine: &mut dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        values: &[Self],
    ) -> Result<()>;
}

macro_rules! impl_column_value {
    ($($t:ty),*) => {$(
        impl ColumnValue for $t {
            fn type_code() -> TypeCode {
                <$t as Scalar>::TYPE_CODE
            }

            fn values_per_row(repeat_count: usize) -> usize {
                repeat_count
            }

            fn validate(_values: &[Self], _repeat_count: usize) -> Result<()> {
                Ok(())
            }

            fn read_cells(
                engine: &dyn StorageEngine,
                index: usize,
                rows: Segment,
                repeat_count: usize,
                out: &mut [Self],
            ) -> Result<()> {
                engine.read_column_cells(index, rows, repeat_count, <$t as Scalar>::cells_mut(out))
            }

            fn write_cells(
                engine: &mut dyn StorageEngine,
                index: usize,
                rows: Segment,
                repeat_count: usize,
                values: &[Self],
            ) -> Result<()> {
                engine.write_column_cells(index, rows, repeat_count, <$t as Scalar>::cells(values))
            }
        }
    )*};
}

impl_column_value!(u8, i8, i16, u16, i32, u32, i64, u64, f32, f64);

impl ColumnValue for String {
    fn type_code() -> TypeCode {
        TypeCode::Str
    }

    fn values_per_row(_repeat_count: usize) -> usize {
        1
    }

    fn validate(values: &[Self], repeat_count: usize) -> Result<()> {
        match values.iter().find(|value| value.len() > repeat_count) {
            Some(value) => Err(FitsError::Validation(format!(
                "String of {} bytes exceeds the repeat count {}",
                value.len(),
                repeat_count
            ))),
            None => Ok(()),
        }
    }

    fn read_cells(
        engine: &dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        out: &mut [Self],
    ) -> Result<()> {
        engine.read_column_cells(index, rows, repeat_count, CellsMut::Str(out))
    }

    fn write_cells(
        engine: &mut dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        values: &[Self],
    ) -> Result<()> {
        engine.write_column_cells(index, rows, repeat_count, Cells::Str(values))
    }
}

impl<T: Scalar + ColumnValue> ColumnValue for Vec<T> {
    fn type_code() -> TypeCode {
        T::TYPE_CODE
    }

    fn values_per_row(_repeat_count: usize) -> usize {
        1
    }

    fn validate(values: &[Self], repeat_count: usize) -> Result<()> {
        match values.iter().find(|value| value.len() != repeat_count) {
            Some(value) => Err(FitsError::Validation(format!(
                "Vector of {} values in a column of repeat count {}",
                value.len(),
                repeat_count
            ))),
            None => Ok(()),
        }
    }

    fn read_cells(
        engine: &dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        out: &mut [Self],
    ) -> Result<()> {
        let mut flat = vec![T::default(); rows.count * repeat_count];
        engine.read_column_cells(index, rows, repeat_count, T::cells_mut(&mut flat))?;
        for (cell, values) in out.iter_mut().zip(flat.chunks(repeat_count.max(1))) {
            cell.clear();
            cell.extend_from_slice(values);
        }
        Ok(())
    }

    fn write_cells(
        engine: &mut dyn StorageEngine,
        index: usize,
        rows: Segment,
        repeat_count: usize,
        values: &[Self],
    ) -> Result<()> {
        Self::validate(values, repeat_count)?;
        let flat: Vec<T> = values.iter().flatten().copied().collect();
        engine.write_column_cells(index, rows, repeat_count, T::cells(&flat))
    }
}

/// Column metadata and values, owned or borrowed depending on `S`
#[derive(Debug, Clone, PartialEq)]
pub struct Column<T, A: Axes = [i64; 1], S = Vec<T>> {
    info: ColumnInfo<A>,
    data: S,
    _value: PhantomData<T>,
}

/// Column which owns its values
pub type VecColumn<T, A = [i64; 1]> = Column<T, A, Vec<T>>;

/// Read-only view on the values of a column
pub type PtrColumn<'a, T, A = [i64; 1]> = Column<T, A, &'a [T]>;

/// Read-write view on the values of a column
pub type PtrColumnMut<'a, T, A = [i64; 1]> = Column<T, A, &'a mut [T]>;

impl<T: ColumnValue, A: Axes, S: AsRef<[T]>> Column<T, A, S> {
    /// Bind values to an info, checking the buffer against the repeat count
    pub fn new(info: ColumnInfo<A>, data: S) -> Result<Self> {
        let per_row = T::values_per_row(info.repeat_count());
        let len = data.as_ref().len();
        let aligned = if per_row == 0 { len == 0 } else { len % per_row == 0 };
        if !aligned {
            return Err(FitsError::Validation(format!(
                "Buffer of {} values is not a multiple of the repeat count {} of column '{}'",
                len,
                per_row,
                info.name
            )));
        }
        T::validate(data.as_ref(), info.repeat_count())?;
        Ok(Self {
            info,
            data,
            _value: PhantomData,
        })
    }

    pub fn info(&self) -> &ColumnInfo<A> {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn unit(&self) -> &str {
        &self.info.unit
    }

    pub fn repeat_count(&self) -> usize {
        self.info.repeat_count()
    }

    fn values_per_row(&self) -> usize {
        T::values_per_row(self.repeat_count())
    }

    pub fn row_count(&self) -> usize {
        match self.values_per_row() {
            0 => 0,
            per_row => self.data.as_ref().len() / per_row,
        }
    }

    pub fn data(&self) -> &[T] {
        self.data.as_ref()
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.info.name = name.into();
    }

    /// Change the cell shape, keeping the repeat count and the buffer
    pub fn reshape<B: Axes>(self, shape: Position<B>) -> Result<Column<T, B, S>> {
        if shape.shape_size()? != self.repeat_count() {
            return Err(FitsError::Validation(format!(
                "Cannot reshape column '{}' of repeat count {} to {}",
                self.info.name,
                self.repeat_count(),
                shape
            )));
        }
        Ok(Column {
            info: ColumnInfo {
                name: self.info.name,
                unit: self.info.unit,
                shape,
            },
            data: self.data,
            _value: PhantomData,
        })
    }

    fn element_offset(&self, row: i64, index: i64) -> Result<usize> {
        let row = resolve_backward(row, to_i64(self.row_count())?)?;
        let index = resolve_backward(index, to_i64(self.values_per_row())?)?;
        Ok(row as usize * self.values_per_row() + index as usize)
    }

    /// Element `index` of row `row`, both possibly backward
    pub fn at(&self, row: i64, index: i64) -> Result<&T> {
        let offset = self.element_offset(row, index)?;
        Ok(&self.data.as_ref()[offset])
    }

    fn row_range(&self, rows: Segment) -> Result<std::ops::Range<usize>> {
        if rows.end() > self.row_count() {
            return Err(FitsError::OutOfBounds(format!(
                "Rows {}..{} of column '{}' with {} rows",
                rows.first,
                rows.end(),
                self.info.name,
                self.row_count()
            )));
        }
        let per_row = self.values_per_row();
        Ok(rows.first * per_row..rows.end() * per_row)
    }

    /// View on some rows
    pub fn slice(&self, rows: Segment) -> Result<PtrColumn<'_, T, A>> {
        let range = self.row_range(rows)?;
        Ok(Column {
            info: self.info.clone(),
            data: &self.data.as_ref()[range],
            _value: PhantomData,
        })
    }

    /// Copy into an owned column
    pub fn to_vec_column(&self) -> VecColumn<T, A> {
        Column {
            info: self.info.clone(),
            data: self.data.as_ref().to_vec(),
            _value: PhantomData,
        }
    }
}

impl<T: ColumnValue, A: Axes, S: AsRef<[T]> + AsMut<[T]>> Column<T, A, S> {
    pub fn data_mut(&mut self) -> &mut [T] {
        self.data.as_mut()
    }

    pub fn at_mut(&mut self, row: i64, index: i64) -> Result<&mut T> {
        let offset = self.element_offset(row, index)?;
        Ok(&mut self.data.as_mut()[offset])
    }

    pub fn slice_mut(&mut self, rows: Segment) -> Result<PtrColumnMut<'_, T, A>> {
        let range = self.row_range(rows)?;
        Ok(Column {
            info: self.info.clone(),
            data: &mut self.data.as_mut()[range],
            _value: PhantomData,
        })
    }
}

impl<T: Scalar + ColumnValue, A: Axes, S: AsRef<[T]>> Column<T, A, S> {
    /// Cell of a row as a raster of the cell shape; `row` may be backward
    pub fn field(&self, row: i64) -> Result<PtrRaster<'_, T, A>> {
        let start = self.element_offset(row, 0)?;
        let end = start + self.repeat_count();
        Raster::new(self.info.shape.clone(), &self.data.as_ref()[start..end])
    }
}

impl<T: Scalar + ColumnValue, A: Axes, S: AsRef<[T]> + AsMut<[T]>> Column<T, A, S> {
    pub fn field_mut(&mut self, row: i64) -> Result<PtrRasterMut<'_, T, A>> {
        let start = self.element_offset(row, 0)?;
        let end = start + self.repeat_count();
        let shape = self.info.shape.clone();
        Raster::new(shape, &mut self.data.as_mut()[start..end])
    }
}

impl<T: ColumnValue, A: Axes> Column<T, A, Vec<T>> {
    /// Column of `rows` default values
    pub fn with_rows(info: ColumnInfo<A>, rows: usize) -> Result<Self> {
        let len = buffer_len(rows, T::values_per_row(info.repeat_count()))?;
        Ok(Self {
            info,
            data: vec![T::default(); len],
            _value: PhantomData,
        })
    }

    /// Grow or shrink to `rows` rows, filling with default values
    pub fn resize_rows(&mut self, rows: usize) -> Result<()> {
        let len = buffer_len(rows, self.values_per_row())?;
        self.data.resize(len, T::default());
        Ok(())
    }

    /// Move the buffer out without copying
    pub fn into_values(self) -> Vec<T> {
        self.data
    }
}

fn buffer_len(rows: usize, values_per_row: usize) -> Result<usize> {
    rows.checked_mul(values_per_row).ok_or_else(|| {
        FitsError::OutOfBounds(format!(
            "{} rows of {} values overflow the buffer size",
            rows, values_per_row
        ))
    })
}

/// Column of any value type, for writing
pub trait DynColumn {
    fn name(&self) -> &str;

    fn unit(&self) -> &str;

    fn repeat_count(&self) -> usize;

    fn row_count(&self) -> usize;

    fn type_code(&self) -> TypeCode;

    /// Name, format code and unit to create the column with
    fn descriptor(&self) -> ColumnDescriptor;

    /// Write some rows of the column to table rows starting at `first_row + rows.first`
    fn write_rows(
        &self,
        engine: &mut dyn StorageEngine,
        index: usize,
        rows: Segment,
        first_row: usize,
    ) -> Result<()>;
}

/// Column of any value type, for reading
pub trait DynColumnMut: DynColumn {
    /// Take the unit and repeat count of the engine column, and resize the
    /// buffer to `rows` rows
    fn prepare(&mut self, descriptor: &ColumnDescriptor, rows: usize) -> Result<()>;

    /// Read some rows of the column from table rows starting at `first_row + rows.first`
    fn read_rows(
        &mut self,
        engine: &dyn StorageEngine,
        index: usize,
        rows: Segment,
        first_row: usize,
    ) -> Result<()>;
}

impl<T: ColumnValue, A: Axes, S: AsRef<[T]>> DynColumn for Column<T, A, S> {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn unit(&self) -> &str {
        &self.info.unit
    }

    fn repeat_count(&self) -> usize {
        self.info.repeat_count()
    }

    fn row_count(&self) -> usize {
        Column::row_count(self)
    }

    fn type_code(&self) -> TypeCode {
        T::type_code()
    }

    fn descriptor(&self) -> ColumnDescriptor {
        self.info.descriptor::<T>()
    }

    fn write_rows(
        &self,
        engine: &mut dyn StorageEngine,
        index: usize,
        rows: Segment,
        first_row: usize,
    ) -> Result<()> {
        let range = self.row_range(rows)?;
        let table_rows = Segment::from_size(first_row + rows.first, rows.count);
        T::write_cells(
            engine,
            index,
            table_rows,
            self.info.repeat_count(),
            &self.data.as_ref()[range],
        )
    }
}

impl<T: ColumnValue, A: Axes> DynColumnMut for Column<T, A, Vec<T>> {
    fn prepare(&mut self, descriptor: &ColumnDescriptor, rows: usize) -> Result<()> {
        let (type_code, repeat_count) = descriptor.format()?;
        if type_code != T::type_code() {
            return Err(FitsError::engine(
                status::BAD_DATATYPE,
                format!(
                    "column '{}' stores {} values, not {}",
                    descriptor.name,
                    type_code,
                    T::type_code()
                ),
            ));
        }
        if repeat_count != self.repeat_count() {
            if self.info.shape.dimension() != 1 {
                return Err(FitsError::Validation(format!(
                    "Cell shape {} cannot hold the {} values of column '{}'",
                    self.info.shape, repeat_count, descriptor.name
                )));
            }
            self.info.shape[0] = to_i64(repeat_count)?;
        }
        self.info.unit = descriptor.unit.clone();
        self.resize_rows(rows)
    }

    fn read_rows(
        &mut self,
        engine: &dyn StorageEngine,
        index: usize,
        rows: Segment,
        first_row: usize,
    ) -> Result<()> {
        let range = self.row_range(rows)?;
        let table_rows = Segment::from_size(first_row + rows.first, rows.count);
        let repeat_count = self.info.repeat_count();
        T::read_cells(engine, index, table_rows, repeat_count, &mut self.data[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_and_descriptor() {
        let info = ColumnInfo::new("NAME", "", 16).unwrap();
        assert_eq!(info.repeat_count(), 16);
        assert_eq!(info.descriptor::<String>().tform, "16A");
        assert_eq!(info.descriptor::<Vec<f32>>().tform, "16E");

        let cube = ColumnInfo::with_shape("CUBE", "adu", Position::from([2, 3, 4])).unwrap();
        assert_eq!(cube.repeat_count(), 24);
        assert!(ColumnInfo::with_shape("BAD", "", Position::from([-2, 3])).is_err());
    }

    #[test]
    fn test_buffer_validation() {
        let info = ColumnInfo::new("POS", "deg", 3).unwrap();
        assert!(VecColumn::new(info.clone(), vec![0.0f64; 6]).is_ok());
        assert!(matches!(
            VecColumn::new(info.clone(), vec![0.0f64; 7]),
            Err(FitsError::Validation(_))
        ));

        let strings = vec!["abc".to_string(), "abcd".to_string()];
        assert!(VecColumn::new(info.clone(), strings).is_err());

        let vectors = vec![vec![1i32, 2, 3], vec![4, 5]];
        assert!(VecColumn::new(info, vectors).is_err());
    }

    #[test]
    fn test_row_count_per_type() {
        let info = ColumnInfo::new("C", "", 4).unwrap();
        assert_eq!(VecColumn::<i16>::with_rows(info.clone(), 5).unwrap().data().len(), 20);
        assert_eq!(VecColumn::<i16>::with_rows(info.clone(), 5).unwrap().row_count(), 5);
        assert_eq!(VecColumn::<String>::with_rows(info.clone(), 5).unwrap().data().len(), 5);
        let vectors = VecColumn::<Vec<u8>>::with_rows(info, 5).unwrap();
        assert_eq!(vectors.row_count(), 5);
        assert!(vectors.data()[0].is_empty());
    }

    #[test]
    fn test_row_count_overflow() {
        let info = ColumnInfo::new("C", "", 4).unwrap();
        assert!(matches!(
            VecColumn::<u8>::with_rows(info.clone(), usize::MAX / 2),
            Err(FitsError::OutOfBounds(_))
        ));

        let mut column = VecColumn::<u8>::with_rows(info, 2).unwrap();
        assert!(column.resize_rows(usize::MAX).is_err());
        assert_eq!(column.data().len(), 8);
        column.resize_rows(3).unwrap();
        assert_eq!(column.row_count(), 3);
    }

    #[test]
    fn test_at_backward() {
        let info = ColumnInfo::new("C", "", 3).unwrap();
        let mut column = VecColumn::new(info, (0..12).collect::<Vec<i32>>()).unwrap();
        assert_eq!(*column.at(0, 0).unwrap(), 0);
        assert_eq!(*column.at(-1, -1).unwrap(), 11);
        assert_eq!(*column.at(1, -3).unwrap(), 3);
        assert!(matches!(column.at(4, 0), Err(FitsError::OutOfBounds(_))));
        *column.at_mut(-2, 1).unwrap() = 100;
        assert_eq!(column.data()[7], 100);
    }

    #[test]
    fn test_field_and_reshape() {
        let info = ColumnInfo::new("IMG", "", 6).unwrap();
        let column = VecColumn::new(info, (0..12).collect::<Vec<u16>>()).unwrap();
        let column = column.reshape(Position::from([3, 2])).unwrap();
        assert_eq!(column.info().shape, Position::from([3, 2]));

        let field = column.field(-1).unwrap();
        assert_eq!(field.shape(), &Position::from([3, 2]));
        assert_eq!(field[&Position::from([2, 1])], 11);

        assert!(column.reshape(Position::from([4, 2])).is_err());
    }

    #[test]
    fn test_slice_and_rename() {
        let info = ColumnInfo::new("C", "", 2).unwrap();
        let mut column = VecColumn::new(info, (0..10).collect::<Vec<i64>>()).unwrap();
        column.rename("D");
        let slice = column.slice(Segment::from_size(1, 3)).unwrap();
        assert_eq!(slice.name(), "D");
        assert_eq!(slice.row_count(), 3);
        assert_eq!(slice.data(), &[2, 3, 4, 5, 6, 7]);
        assert!(column.slice(Segment::from_size(4, 2)).is_err());

        let mut slice = column.slice_mut(Segment::from_size(4, 1)).unwrap();
        slice.data_mut()[1] = -1;
        assert_eq!(column.into_values()[9], -1);
    }

    #[test]
    fn test_prepare_from_descriptor() {
        let info = ColumnInfo::new("FLUX", "", 1).unwrap();
        let mut column = VecColumn::<f32>::with_rows(info, 0).unwrap();
        column.prepare(&ColumnDescriptor::new("FLUX", "3E", "Jy"), 4).unwrap();
        assert_eq!(column.repeat_count(), 3);
        assert_eq!(column.unit(), "Jy");
        assert_eq!(column.data().len(), 12);

        let err = column
            .prepare(&ColumnDescriptor::new("FLUX", "3D", "Jy"), 4)
            .unwrap_err();
        assert_eq!(err.status(), Some(status::BAD_DATATYPE));

        let info = ColumnInfo::with_shape("CUBE", "", Position::from([2, 2])).unwrap();
        let mut cube = VecColumn::<f32, [i64; 2]>::with_rows(info, 0).unwrap();
        assert!(matches!(
            cube.prepare(&ColumnDescriptor::new("CUBE", "3E", ""), 1),
            Err(FitsError::Validation(_))
        ));
    }

    #[test]
    fn test_dyn_column_type_erasure() {
        let ints = VecColumn::new(ColumnInfo::new("I", "", 1).unwrap(), vec![1i32, 2]).unwrap();
        let names = VecColumn::new(
            ColumnInfo::new("S", "", 4).unwrap(),
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        let columns: Vec<&dyn DynColumn> = vec![&ints as &dyn DynColumn, &names];
        let formats: Vec<String> = columns.iter().map(|c| c.descriptor().tform).collect();
        assert_eq!(formats, vec!["1J", "4A"]);
        assert!(columns.iter().all(|c| c.row_count() == 2));
        assert_eq!(columns[1].type_code(), TypeCode::Str);
    }
}
