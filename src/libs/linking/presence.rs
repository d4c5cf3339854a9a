use crate::libs::entity::Entity;
use crate::libs::error::LinkError;
use crate::libs::strain::StrainCollection;
use indexmap::IndexSet;
use nalgebra::DMatrix;

/// 0/1 occurrence of objects (rows) in strains (columns).
///
/// Both axes carry an explicit id -> index map.
#[derive(Debug, Clone)]
pub struct PresenceMatrix {
    rows: IndexSet<String>,
    cols: IndexSet<String>,
    data: DMatrix<f64>,
}

impl PresenceMatrix {
    /// Builds the matrix from `object.has_strain(strain)` for every pair.
    ///
    /// # Errors
    /// `InvalidValue` when two objects share an id.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::entity::{Entity, Gcf};
    /// use nplink::libs::linking::PresenceMatrix;
    /// use nplink::libs::strain::{Strain, StrainCollection};
    ///
    /// let mut strains = StrainCollection::new();
    /// strains.add(Strain::new("strain1")).unwrap();
    /// strains.add(Strain::new("strain2")).unwrap();
    ///
    /// let mut gcf = Gcf::new("gcf1");
    /// gcf.add_strain(Strain::new("strain2")).unwrap();
    ///
    /// let pm = PresenceMatrix::build(&[Entity::from(gcf)], &strains).unwrap();
    /// assert_eq!(pm.shape(), (1, 2));
    /// assert!(!pm.is_present(0, 0));
    /// assert!(pm.is_present(0, 1));
    /// ```
    pub fn build(objects: &[Entity], strains: &StrainCollection) -> Result<Self, LinkError> {
        let mut rows = IndexSet::with_capacity(objects.len());
        for obj in objects {
            if !rows.insert(obj.id().to_string()) {
                return Err(LinkError::invalid_value(format!(
                    "duplicate object id {}",
                    obj
                )));
            }
        }
        let cols: IndexSet<String> = strains.ids().map(|s| s.to_string()).collect();

        let universe: Vec<_> = strains.iter().collect();
        let data = DMatrix::from_fn(objects.len(), universe.len(), |i, j| {
            if objects[i].has_strain(universe[j]) {
                1.0
            } else {
                0.0
            }
        });

        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> &IndexSet<String> {
        &self.rows
    }

    pub fn cols(&self) -> &IndexSet<String> {
        &self.cols
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows.get_index_of(id)
    }

    pub fn is_present(&self, row: usize, col: usize) -> bool {
        self.data[(row, col)] > 0.0
    }

    /// Number of strains each object occurs in
    pub fn row_totals(&self) -> Vec<f64> {
        (0..self.data.nrows())
            .map(|i| self.data.row(i).sum())
            .collect()
    }

    /// Number of objects occurring in each strain
    pub fn col_totals(&self) -> Vec<f64> {
        (0..self.data.ncols())
            .map(|j| self.data.column(j).sum())
            .collect()
    }

    /// Columns where both rows are present
    pub fn shared_cols(&self, row: usize, other: &PresenceMatrix, other_row: usize) -> Vec<usize> {
        (0..self.data.ncols())
            .filter(|&j| self.is_present(row, j) && other.is_present(other_row, j))
            .collect()
    }
}
