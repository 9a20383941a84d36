//! Per-port flux spectra and how they are written to disk.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::Error;

/// How data should be saved to file.
#[derive(Debug)]
pub struct SaveSettings<P: AsRef<Path>> {
    /// The path to the save file.
    pub filename: P,
    /// What format to save in.
    pub save_type: SaveType,
    /// Whether or not to overwrite any possible saved data.
    pub overwrite: bool,
}

impl<P: AsRef<Path>> SaveSettings<P> {
    /// Fails with `DuplicateRun` if saving would collide with a run already in the file.
    pub fn check(&self) -> Result<(), Error> {
        let filename = self.filename.as_ref();
        if let SaveType::Hdf5 { ref group } = self.save_type {
            if !self.overwrite && filename.exists() && hdf5::File::open(filename)?.group(group).is_ok() {
                return Err(Error::DuplicateRun(group.to_string()));
            }
        }
        Ok(())
    }
}

/// Represents how spectra are saved.
#[derive(Clone, PartialEq, Debug)]
pub enum SaveType {
    /// Whitespace delimited text, one `frequency flux_1 ... flux_n` line per frequency.
    Text,
    /// A group of `frequencies` and `flux` datasets in an HDF5 file.
    Hdf5 { group: String },
}

/// Flux through each monitor, sampled over a band of frequencies.
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSpectra {
    frequencies: ndarray::Array1<f64>,
    /// One row per frequency, one column per monitor.
    flux: ndarray::Array2<f64>,
}

impl FluxSpectra {
    pub fn new(
        frequencies: ndarray::Array1<f64>,
        flux: ndarray::Array2<f64>,
    ) -> Result<Self, Error> {
        if flux.nrows() != frequencies.len() {
            return Err(Error::BadInit {
                array_name: "Flux".to_string(),
                input_length: flux.nrows(),
                expected_length: frequencies.len(),
            });
        }
        Ok(Self { frequencies, flux })
    }

    #[inline]
    pub fn frequencies(&self) -> ndarray::ArrayView1<f64> {
        self.frequencies.view()
    }

    #[inline]
    pub fn flux(&self) -> ndarray::ArrayView2<f64> {
        self.flux.view()
    }

    #[inline]
    pub fn nfreq(&self) -> usize {
        self.frequencies.len()
    }

    #[inline]
    pub fn nmonitors(&self) -> usize {
        self.flux.ncols()
    }

    /// Flux through the `monitor`th monitor at every frequency.
    pub fn monitor(&self, monitor: usize) -> Option<ndarray::ArrayView1<f64>> {
        (monitor < self.nmonitors()).then(|| self.flux.column(monitor))
    }

    /// Flux through every monitor relative to monitor `reference`.
    ///
    /// Frequencies where the reference flux vanishes give NaN.
    pub fn transmittance(&self, reference: usize) -> Result<ndarray::Array2<f64>, Error> {
        let reference = self.monitor(reference).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no monitor {} among {} monitors",
                reference,
                self.nmonitors(),
            ))
        })?;

        let mut trans = self.flux.clone();
        for mut column in trans.columns_mut() {
            ndarray::Zip::from(&mut column)
                .and(&reference)
                .for_each(|t, &r| {
                    *t = if r == 0.0 { f64::NAN } else { *t / r };
                });
        }
        Ok(trans)
    }

    /// Writes one `frequency flux_1 ... flux_n` line per frequency.
    pub fn write_text<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        for (freq, row) in self.frequencies.iter().zip(self.flux.rows()) {
            write!(writer, "{}", freq)?;
            for flux in row.iter() {
                write!(writer, " {}", flux)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the spectra according to `settings`.
    pub fn save<P: AsRef<Path>>(&self, settings: &SaveSettings<P>) -> Result<(), Error> {
        let filename = settings.filename.as_ref();
        match settings.save_type {
            SaveType::Text => {
                let file = if settings.overwrite || !filename.exists() {
                    File::create(filename)?
                } else {
                    OpenOptions::new().append(true).open(filename)?
                };
                self.write_text(BufWriter::new(file))
            }
            SaveType::Hdf5 { ref group } => self.save_hdf5(filename, group, settings.overwrite),
        }
    }

    fn save_hdf5(&self, filename: &Path, group: &str, overwrite: bool) -> Result<(), Error> {
        let file = if filename.exists() && !overwrite {
            hdf5::File::append(filename)?
        } else {
            hdf5::File::create(filename)?
        };

        if file.group(group).is_ok() {
            return Err(Error::DuplicateRun(group.to_string()));
        }
        let run = file.create_group(group)?;
        run.new_dataset::<f64>()
            .shape(self.nfreq())
            .create("frequencies")?
            .write(self.frequencies.view())?;
        run.new_dataset::<f64>()
            .shape((self.nfreq(), self.nmonitors()))
            .create("flux")?
            .write(self.flux.view())?;

        // save monitor count as a group attribute
        run.new_attr::<u64>()
            .shape(hdf5::Extents::Scalar)
            .create("nmonitors")?
            .write_scalar(&(self.nmonitors() as u64))?;

        file.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn spectra() -> FluxSpectra {
        FluxSpectra::new(
            arr1(&[0.5, 0.75]),
            arr2(&[[2.0, 1.0, 0.5, 0.0], [0.0, 1.5, 0.25, 0.0]]),
        )
        .unwrap()
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = FluxSpectra::new(arr1(&[0.5, 0.75, 1.0]), arr2(&[[1.0, 2.0]])).unwrap_err();
        assert!(matches!(
            err,
            Error::BadInit { input_length: 1, expected_length: 3, .. }
        ));
    }

    #[test]
    fn text_lines_have_frequency_then_each_port() {
        let mut out = Vec::new();
        spectra().write_text(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0.5 2 1 0.5 0\n0.75 0 1.5 0.25 0\n",
        );
    }

    #[test]
    fn transmittance_is_relative_to_reference() {
        let trans = spectra().transmittance(0).unwrap();

        assert_eq!(trans.row(0).to_vec(), vec![1.0, 0.5, 0.25, 0.0]);
        assert!(trans.row(1).iter().all(|t| t.is_nan()));
        assert!(spectra().transmittance(4).is_err());
    }

    #[test]
    fn existing_hdf5_group_fails_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let settings = |group: &str, overwrite: bool| SaveSettings {
            filename: dir.path().join("runs.h5"),
            save_type: SaveType::Hdf5 { group: group.to_string() },
            overwrite,
        };

        settings("a", false).check().unwrap();
        spectra().save(&settings("a", false)).unwrap();

        assert!(matches!(settings("a", false).check(), Err(Error::DuplicateRun(_))));
        settings("b", false).check().unwrap();
        settings("a", true).check().unwrap();
    }

    #[test]
    fn monitor_columns() {
        let s = spectra();
        assert_eq!(s.monitor(1).unwrap().to_vec(), vec![1.0, 1.5]);
        assert!(s.monitor(4).is_none());
        assert_eq!(s.nfreq(), 2);
        assert_eq!(s.nmonitors(), 4);
    }
}
