#![cfg(test)]

mod support;

mod discovery {
    mod integration;
}

mod session {
    mod integration;
}

mod reporting {
    mod integration;
}
