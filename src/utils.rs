/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

/// Byte count of an `f32` array of the given shape, for human consumption
pub fn describe_shape(shape: &[usize]) -> String {
    let elements: usize = shape.iter().product();
    let dims = shape.iter().map(|n| group_digits(n)).collect::<Vec<_>>().join(" x ");
    format!("[{dims}] ({} MiB)", group_digits(elements * std::mem::size_of::<f32>() / (1 << 20)))
}

pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use std::io::Write;

    /// Wall-clock timing of consecutive pipeline stages, reported on stdout
    pub struct Progress {
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            std::io::stdout().flush().ok();
            self.start_timer();
        }

        /// Print message, go to next line, start timer
        pub fn startln(&mut self, message: &str) {
            println!("{message} ... ");
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            println!("{} ms", group_digits(self.elapsed_ms()));
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            println!("{message}: {} ms", group_digits(self.elapsed_ms()));
            self.start_timer();
        }

        fn elapsed_ms(&self) -> u128 { self.previous.elapsed().as_millis() }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}

#[cfg(test)]
mod test_utils {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/ n        , expected     ,
             case(        0, "0"          ),
             case(      999, "999"        ),
             case(     4000, "4,000"      ),
             case(123456789, "123,456,789"),
    )]
    fn digits_grouped(n: usize, expected: &str) {
        assert_eq!(group_digits(n), expected);
    }

    #[test]
    fn shape_description() {
        assert_eq!(describe_shape(&[4000, 128, 97]), "[4,000 x 128 x 97] (189 MiB)");
    }
}
