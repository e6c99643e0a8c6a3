use error_stack::{Context, Report};

// Figment errors are dissected so the report can tell exactly which
// key failed to parse and where it came from (a file or env vars).
pub trait FigmentErrorAttachable<T: Context> {
    fn attach_figment_error(self, err: figment::Error) -> Report<T>;
}

impl<T: Context> FigmentErrorAttachable<T> for Report<T> {
    fn attach_figment_error(self, errors: figment::Error) -> Report<T> {
        let mut this = self;
        for e in errors {
            let mut line = format!("{}", e.kind);
            if let (Some(profile), Some(md)) = (&e.profile, &e.metadata) {
                if !e.path.is_empty() {
                    let key = md.interpolate(profile, &e.path);
                    line.push_str(&format!(" for key {key:?}"));
                }
            }

            if let Some(md) = &e.metadata {
                if let Some(source) = &md.source {
                    line.push_str(&format!(" in {source} {}", md.name));
                } else {
                    line.push_str(&format!(" in {}", md.name));
                }
            }
            this = this.attach_printable(line);
        }
        this
    }
}
