//! Static tile map and its plain-text format.

use std::str::FromStr;

use realmwalk_core::{GridDimensions, TileCoord, Walkability};
use thiserror::Error;

/// Symbol marking a walkable tile in text maps.
pub const OPEN_SYMBOL: char = '.';
/// Symbol marking a blocked tile in text maps.
pub const BLOCKED_SYMBOL: char = '#';

/// Errors raised while parsing a text map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The text held no rows.
    #[error("map contains no rows")]
    Empty,
    /// A row's length differs from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character other than the open or blocked symbol appeared.
    #[error("unknown tile symbol {symbol:?} at column {column}, row {row}")]
    UnknownSymbol {
        /// Offending character.
        symbol: char,
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
    /// The map is larger than tile coordinates can address.
    #[error("map dimensions exceed the addressable grid")]
    TooLarge,
    /// No tile of the map is walkable, so the player cannot be placed.
    #[error("map has no walkable tile")]
    NoWalkableTile,
}

/// Static walkability of every tile in the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    dimensions: GridDimensions,
    walkable: Vec<bool>,
}

impl TileMap {
    /// Map where every tile is walkable.
    #[must_use]
    pub fn open(width: u32, height: u32) -> Self {
        let dimensions = GridDimensions::new(width, height);
        Self {
            walkable: vec![true; dimensions.tile_count()],
            dimensions,
        }
    }

    /// Returns the map with the provided tiles marked as blocked.
    #[must_use]
    pub fn with_blocked<I: IntoIterator<Item = TileCoord>>(mut self, tiles: I) -> Self {
        for tile in tiles {
            if let Some(index) = self.dimensions.index(tile) {
                self.walkable[index] = false;
            }
        }
        self
    }

    /// Number of walkable tiles.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|open| **open).count()
    }
}

impl Walkability for TileMap {
    fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    fn is_walkable(&self, tile: TileCoord) -> bool {
        self.dimensions
            .index(tile)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }
}

impl FromStr for TileMap {
    type Err = MapError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(MapError::Empty);
        };
        let width = first.chars().count();

        let mut walkable = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(MapError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }
            for (column, symbol) in line.chars().enumerate() {
                match symbol {
                    OPEN_SYMBOL => walkable.push(true),
                    BLOCKED_SYMBOL => walkable.push(false),
                    _ => {
                        return Err(MapError::UnknownSymbol {
                            symbol,
                            column,
                            row,
                        })
                    }
                }
            }
        }

        let width = u32::try_from(width).map_err(|_| MapError::TooLarge)?;
        let height = u32::try_from(rows.len()).map_err(|_| MapError::TooLarge)?;
        Ok(Self {
            dimensions: GridDimensions::new(width, height),
            walkable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_and_blocked_tiles() {
        let map: TileMap = "..#\n#..\n".parse().expect("valid map");
        assert_eq!(map.dimensions(), GridDimensions::new(3, 2));
        assert!(map.is_walkable(TileCoord::new(0, 0)));
        assert!(!map.is_walkable(TileCoord::new(2, 0)));
        assert!(!map.is_walkable(TileCoord::new(0, 1)));
        assert!(!map.is_walkable(TileCoord::new(3, 0)));
        assert_eq!(map.walkable_count(), 4);
        assert_eq!(map.cost(TileCoord::new(2, 0)), f32::INFINITY);
    }

    #[test]
    fn rejects_ragged_rows() {
        let error = "...\n..\n".parse::<TileMap>().unwrap_err();
        assert_eq!(
            error,
            MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_unknown_symbols() {
        let error = ".x.\n".parse::<TileMap>().unwrap_err();
        assert_eq!(
            error,
            MapError::UnknownSymbol {
                symbol: 'x',
                column: 1,
                row: 0
            }
        );
        assert_eq!("\n\n".parse::<TileMap>().unwrap_err(), MapError::Empty);
    }
}
