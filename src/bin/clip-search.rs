fn main() -> std::process::ExitCode {
    caption_clipper_lib::run_search()
}
