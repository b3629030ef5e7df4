fn main() {
    pipecat::app::startup::startup();
}
