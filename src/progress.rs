/// Forwards percentage progress to an optional observer, calling it only when the value changes.
pub(crate) struct ProgressReporter<'a> {
    observer: Option<&'a mut dyn FnMut(u8)>,
    last: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(observer: Option<&'a mut dyn FnMut(u8)>) -> Self {
        ProgressReporter {
            observer,
            last: None,
        }
    }

    pub(crate) fn update(&mut self, done: usize, total: usize) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };

        let percent = match total {
            0 => 100,
            total => (done.min(total) * 100 / total) as u8,
        };

        if self.last != Some(percent) {
            self.last = Some(percent);
            observer(percent);
        }
    }

    pub(crate) fn finish(&mut self) {
        self.update(1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_reports_only_changes() -> Result<()> {
        let mut seen = vec![];
        let mut observer = |p: u8| seen.push(p);

        let mut progress = ProgressReporter::new(Some(&mut observer as &mut dyn FnMut(u8)));
        for done in 0..=400 {
            progress.update(done, 400);
        }
        progress.finish();
        drop(progress);

        assert_eq!(seen.len(), 101);
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));

        Ok(())
    }

    #[test]
    fn test_without_observer() -> Result<()> {
        let mut progress = ProgressReporter::new(None);
        progress.update(3, 4);
        progress.finish();

        Ok(())
    }
}
